use anyhow::{Context, Result};
use log::info;
use toggl_accounting::TagAction;

use crate::cli::repository::TogglRepository;

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ArgEnum)]
pub enum TagOperation {
    Add,
    Remove,
}

impl From<TagOperation> for TagAction {
    fn from(operation: TagOperation) -> Self {
        match operation {
            TagOperation::Add => TagAction::Add,
            TagOperation::Remove => TagAction::Remove,
        }
    }
}

/// `tag`サブコマンドの引数。
#[derive(Debug, clap::Args)]
pub struct TagArgs {
    #[clap(arg_enum, help = "Whether to add or remove the tag")]
    operation: TagOperation,

    #[clap(long = "tag-id", help = "Id of the tag")]
    tag_id: i64,

    #[clap(required = true, help = "Ids of the time entries")]
    entry_ids: Vec<i64>,
}

/// 複数のタイムエントリーのタグを一括で付け外しする。
pub struct TagCommand<'a, T: TogglRepository> {
    toggl_client: &'a T,
}

impl<'a, T: TogglRepository> TagCommand<'a, T> {
    pub fn new(toggl_client: &'a T) -> Self {
        Self { toggl_client }
    }

    /// `tag`サブコマンドの処理を行う。
    pub async fn run(&self, tag: TagArgs) -> Result<()> {
        self.toggl_client
            .tag_entries(&tag.entry_ids, tag.tag_id, tag.operation.into())
            .await
            .with_context(|| format!("Failed to update tags of {:?}", tag.entry_ids))?;
        info!(
            "Tag {} {:?} on {} time entries.",
            tag.tag_id,
            tag.operation,
            tag.entry_ids.len()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;
    use toggl_accounting::TagAction;

    use super::{TagArgs, TagCommand, TagOperation};
    use crate::cli::repository::MockTogglRepository;

    #[rstest]
    #[case::add(TagOperation::Add, TagAction::Add)]
    #[case::remove(TagOperation::Remove, TagAction::Remove)]
    #[tokio::test]
    async fn test_tag_command(#[case] operation: TagOperation, #[case] expected: TagAction) {
        let args = TagArgs {
            operation,
            tag_id: 3,
            entry_ids: vec![10, 11],
        };
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_tag_entries()
            .withf(move |ids, tag_id, action| {
                ids.to_vec() == vec![10, 11] && *tag_id == 3 && *action == expected
            })
            .times(1)
            .returning(|_, _, _| Ok(()));

        let command = TagCommand::new(&toggl);

        assert!(command.run(args).await.is_ok());
    }

    #[tokio::test]
    async fn test_tag_command_error() {
        let args = TagArgs {
            operation: TagOperation::Add,
            tag_id: 3,
            entry_ids: vec![10],
        };
        let mut toggl = MockTogglRepository::new();
        toggl
            .expect_tag_entries()
            .times(1)
            .returning(|_, _, _| Err(anyhow::anyhow!("Toggl API returned status code 500!")));

        let command = TagCommand::new(&toggl);

        assert!(command.run(args).await.is_err());
    }
}
