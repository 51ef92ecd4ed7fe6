use log::warn;

use crate::cell::VersionedCell;
use crate::error::{Error, Result};
use crate::transport::Response;

/// UIが表示するための、最後に発生したエラー。
#[derive(Debug, Default)]
pub struct LastError(VersionedCell<Option<String>>);

impl LastError {
    pub fn get(&self) -> Option<String> {
        self.0.get()
    }

    pub fn record(&self, error: &Error) {
        warn!("{}", error);
        self.0.set(Some(error.to_string()));
    }

    pub fn clear(&self) {
        self.0.set(None);
    }
}

/// レスポンスが2xxであることを確認する。
///
/// 2xxの場合は記録済みのエラーを消してそのまま返す。
/// それ以外は`Error::Api`を記録して返す。
pub fn assert_ok(response: Response, last_error: &LastError) -> Result<Response> {
    if response.status < 300 {
        last_error.clear();
        return Ok(response);
    }

    let error = Error::Api {
        status: response.status,
        body: response.text,
    };
    last_error.record(&error);
    Err(error)
}
