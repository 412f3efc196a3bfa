use pagsmile_relay::diagnostics::{example_payload, CARD_PAY_PARAMS, COMMON_CAUSES};

const NAME_WIDTH: usize = 15;
const DESCRIPTION_WIDTH: usize = 52;
const SOURCE_WIDTH: usize = 13;

fn rule(left: char, mid: char, right: char) -> String {
    format!(
        "{left}{}{mid}{}{mid}{}{right}",
        "─".repeat(NAME_WIDTH + 2),
        "─".repeat(DESCRIPTION_WIDTH + 2),
        "─".repeat(SOURCE_WIDTH + 2),
    )
}

fn row(name: &str, description: &str, source: &str) -> String {
    format!(
        "│ {:<nw$} │ {:<dw$} │ {:<sw$} │",
        name,
        description,
        source,
        nw = NAME_WIDTH,
        dw = DESCRIPTION_WIDTH,
        sw = SOURCE_WIDTH,
    )
}

/// The required-parameter table as printable lines.
pub fn checklist_table() -> Vec<String> {
    let mut lines = vec![
        rule('┌', '┬', '┐'),
        row("Parameter", "Description", "Source"),
        rule('├', '┼', '┤'),
    ];
    lines.extend(
        CARD_PAY_PARAMS
            .iter()
            .map(|p| row(p.name, p.description, p.source)),
    );
    lines.push(rule('└', '┴', '┘'));
    lines
}

pub fn print_report() {
    println!("Required parameters for submit-card-pay\n");
    for line in checklist_table() {
        println!("{line}");
    }

    println!("\nHow to check");
    println!("  1. Run the relay with RUST_LOG=debug");
    println!("  2. Find the \"outbound body\" event for the submit-card-pay request");
    println!("  3. Compare the keys it carries with the table above");
    println!("  4. A \"card payment is missing required parameters\" warning names the gaps");

    println!("\nCommon causes of gateway error 40001");
    for (i, (issue, fix)) in COMMON_CAUSES.iter().enumerate() {
        println!("  {}. {}", i + 1, issue);
        println!("     fix: {}", fix);
    }

    println!("\nExample submit-card-pay body");
    let example = example_payload();
    println!(
        "{}",
        serde_json::to_string_pretty(&example).unwrap_or_else(|_| example.to_string())
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_has_row_per_param() {
        let table = checklist_table();
        // header rule, heading, separator, rows, footer rule
        assert_eq!(table.len(), CARD_PAY_PARAMS.len() + 4);
        assert!(table.iter().any(|l| l.contains("card_token")));
    }

    #[test]
    fn test_rows_are_aligned() {
        let table = checklist_table();
        let width = table[0].chars().count();
        assert!(table.iter().all(|l| l.chars().count() == width));
    }
}
