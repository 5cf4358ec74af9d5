// Runtime domain

use crate::protocol::command::Command;
use crate::protocol::schema::{FieldKind, FieldSpec, Schema};

pub const EVALUATE_RESULT: Schema = Schema::new(&[
    FieldSpec::required("result", FieldKind::Object),
    FieldSpec::optional("exceptionDetails", FieldKind::Object),
]);

pub fn enable() -> Command {
    Command::new("Runtime.enable")
}

/// Evaluates `expression` in the page's global context, returning the value
/// by value rather than as a remote object handle.
pub fn evaluate(expression: &str) -> Command {
    Command::new("Runtime.evaluate")
        .param("expression", expression)
        .param("returnByValue", true)
        .returns(EVALUATE_RESULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_evaluate_requests_value_and_declares_result() {
        let cmd = evaluate("document.title");
        assert_eq!(cmd.params()["expression"], "document.title");
        assert_eq!(cmd.params()["returnByValue"], true);
        assert_eq!(cmd.result_schema(), Some(&EVALUATE_RESULT));
        assert!(enable().params().is_empty());
    }
}
