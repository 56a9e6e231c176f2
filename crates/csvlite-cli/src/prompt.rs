//! Interactive column type selection

use csvlite_common::TypeTag;
use csvlite_ingest::{ResolveError, TypeResolver};
use inquire::{InquireError, Select};

/// Asks for the type of every column, one selection list per column
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptResolver;

impl TypeResolver for PromptResolver {
    fn resolve(&mut self, columns: &[String]) -> Result<Vec<TypeTag>, ResolveError> {
        let options = TypeTag::ALL.to_vec();
        let cursor = starting_cursor(&options);

        columns
            .iter()
            .enumerate()
            .map(|(index, column)| {
                let message = format!("Type of '{}' ({}/{})", column, index + 1, columns.len());
                Select::new(&message, options.clone())
                    .with_starting_cursor(cursor)
                    .with_help_message("↑↓ to move, enter to select, esc to cancel")
                    .prompt()
                    .map_err(prompt_error)
            })
            .collect()
    }
}

/// Every list opens on the default type
fn starting_cursor(options: &[TypeTag]) -> usize {
    options
        .iter()
        .position(|tag| *tag == TypeTag::default())
        .unwrap_or(0)
}

fn prompt_error(err: InquireError) -> ResolveError {
    match err {
        InquireError::OperationCanceled | InquireError::OperationInterrupted => {
            ResolveError::Cancelled
        },
        other => ResolveError::Failed(other.to_string()),
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_cancel_maps_to_cancelled() {
        assert!(matches!(
            prompt_error(InquireError::OperationCanceled),
            ResolveError::Cancelled
        ));
        assert!(matches!(
            prompt_error(InquireError::OperationInterrupted),
            ResolveError::Cancelled
        ));
        assert!(matches!(
            prompt_error(InquireError::NotTTY),
            ResolveError::Failed(_)
        ));
    }

    #[test]
    fn test_lists_open_on_default_type() {
        let options = TypeTag::ALL.to_vec();
        assert_eq!(options[starting_cursor(&options)], TypeTag::default());
        assert_eq!(starting_cursor(&[TypeTag::Real]), 0);
    }
}
