//! Result record rendering.
//!
//! The record goes to standard output as JSON so orchestrators can parse it;
//! the status line and the optional diff go to standard error.

use crate::Context;
use crate::ui;
use anyhow::Result;
use colored::Colorize;
use reconcile::{Diff, MessageCode, ResultRecord};
use serde_json::Value;
use similar::{ChangeTag, TextDiff};

/// Print `record`, its status line and, when asked, its diff.
pub fn emit(ctx: &Context, record: &ResultRecord, show_diff: bool) -> Result<()> {
    if !ctx.quiet {
        status(record);
        if ctx.verbose > 0
            && let Some(exception) = &record.exception
        {
            ui::dim(exception);
        }
    }
    if show_diff {
        match &record.diff {
            Some(diff) => print_diff(diff)?,
            None if !ctx.quiet => ui::dim("(no changes)"),
            None => {}
        }
    }
    println!("{}", serde_json::to_string_pretty(record)?);
    Ok(())
}

fn status(record: &ResultRecord) {
    if record.failed {
        ui::error(&format!("{} [{}]", record.msg, record.code));
    } else if record.code == MessageCode::TaskScheduled {
        ui::warn(&record.msg);
    } else if record.changed {
        ui::success(&record.msg);
    } else {
        ui::info(&record.msg);
    }
}

/// Turn any error into a failure record.
///
/// Reconciliation and appliance errors keep their own codes; anything else
/// (bad input, unreadable files, configuration) is a value error.
pub fn failure_record(err: anyhow::Error) -> ResultRecord {
    let err = match err.downcast::<reconcile::Error>() {
        Ok(err) => return ResultRecord::failure(&err),
        Err(err) => err,
    };
    let err = match err.downcast::<appliance::Error>() {
        Ok(err) => return ResultRecord::failure(&reconcile::Error::Appliance(err)),
        Err(err) => err,
    };
    let mut record =
        ResultRecord::with_message(false, MessageCode::ValueError, format!("{err:#}"));
    record.failed = true;
    record
}

// ============================================================================
// Diff
// ============================================================================

/// Changed lines between the pretty-printed before and after states.
fn diff_lines(diff: &Diff) -> Result<Vec<(ChangeTag, String)>> {
    let before = pretty(&diff.before)?;
    let after = pretty(&diff.after)?;
    Ok(TextDiff::from_lines(&before, &after)
        .iter_all_changes()
        .filter(|change| change.tag() != ChangeTag::Equal)
        .map(|change| (change.tag(), change.to_string_lossy().trim_end().to_string()))
        .collect())
}

fn pretty(value: &Value) -> Result<String> {
    if value.is_null() {
        return Ok(String::new());
    }
    let mut text = serde_json::to_string_pretty(value)?;
    text.push('\n');
    Ok(text)
}

fn print_diff(diff: &Diff) -> Result<()> {
    for (tag, line) in diff_lines(diff)? {
        match tag {
            ChangeTag::Delete => eprintln!("  {}", format!("- {line}").red()),
            ChangeTag::Insert => eprintln!("  {}", format!("+ {line}").green()),
            ChangeTag::Equal => {}
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;
    use serde_json::json;

    #[test]
    fn test_diff_lines_for_update() {
        let diff = Diff {
            before: json!({"name": "net1", "vlanId": 10}),
            after: json!({"name": "net1", "vlanId": 20}),
        };
        let lines = diff_lines(&diff).unwrap();
        assert_eq!(
            lines,
            vec![
                (ChangeTag::Delete, r#"  "vlanId": 10"#.to_string()),
                (ChangeTag::Insert, r#"  "vlanId": 20"#.to_string()),
            ]
        );
    }

    #[test]
    fn test_diff_lines_for_create() {
        let diff = Diff {
            before: Value::Null,
            after: json!({"name": "net1"}),
        };
        let lines = diff_lines(&diff).unwrap();
        assert!(lines.iter().all(|(tag, _)| *tag == ChangeTag::Insert));
        assert!(lines.iter().any(|(_, line)| line.contains("net1")));
    }

    #[test]
    fn test_failure_record_keeps_reconcile_code() {
        let err = reconcile::Error::not_found("FC Network", "net9");
        let record = failure_record(err.into());
        assert!(record.failed);
        assert_eq!(record.code, MessageCode::ResourceNotFound);
    }

    #[test]
    fn test_failure_record_for_appliance_error() {
        let err = appliance::Error::status(412, "stale");
        let record = failure_record(err.into());
        assert_eq!(record.code, MessageCode::EtagConflict);
    }

    #[test]
    fn test_failure_record_for_other_errors() {
        let record = failure_record(anyhow!("unknown kind 'widget'"));
        assert!(record.failed);
        assert!(!record.changed);
        assert_eq!(record.code, MessageCode::ValueError);
        assert!(record.msg.contains("widget"));
    }
}
