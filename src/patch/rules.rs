//! The concrete patch rules shipped with the pipeline.
//!
//! Two independent, independently idempotent rules against the minified
//! script bundle. Their severities differ on purpose: the platform rule
//! unlocks the whole port and must abort the run when the vendor's code
//! changed, while the close-behavior rule is a quality-of-life tweak
//! that only warns when it no longer matches.

use super::{PatchRule, ReplaceScope, Severity};

/// Inserts the Linux branch into the runtime's platform-detection
/// function, immediately before its terminal error throw.
pub fn platform_rule() -> PatchRule {
    PatchRule {
        name: "platform-detection",
        fragment: r#"if(platform==="win32")return"win32-x64";throw new Error"#,
        replacement: concat!(
            r#"if(platform==="win32")return"win32-x64";"#,
            r#"if(platform==="linux")return e==="arm64"?"linux-arm64":"linux-x64";"#,
            "throw new Error"
        ),
        marker: r#"if(platform==="linux")return e==="arm64"?"linux-arm64":"linux-x64";"#,
        severity: Severity::Required,
        scope: ReplaceScope::First,
    }
}

/// Disables the hide-to-tray branch of the window close handler so
/// closing the last window quits the app.
pub fn close_behavior_rule() -> PatchRule {
    PatchRule {
        name: "close-quits-app",
        fragment: r#"o||(t.preventDefault(),n.hide())"#,
        replacement: r#"o||!0||(t.preventDefault(),n.hide())"#,
        marker: r#"o||!0||"#,
        severity: Severity::BestEffort,
        scope: ReplaceScope::First,
    }
}

/// All rules, in application order.
pub fn default_rules() -> Vec<PatchRule> {
    vec![platform_rule(), close_behavior_rule()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn markers_are_substrings_of_replacements() {
        for rule in default_rules() {
            assert!(
                rule.replacement.contains(rule.marker),
                "rule '{}' cannot verify after apply",
                rule.name
            );
        }
    }

    #[test]
    fn fragments_do_not_contain_markers() {
        // Otherwise an unpatched file would read as already applied.
        for rule in default_rules() {
            assert!(
                !rule.fragment.contains(rule.marker),
                "rule '{}' marker matches unpatched content",
                rule.name
            );
        }
    }

    #[test]
    fn severity_asymmetry_is_preserved() {
        assert_eq!(platform_rule().severity, Severity::Required);
        assert_eq!(close_behavior_rule().severity, Severity::BestEffort);
    }
}
