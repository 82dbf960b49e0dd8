use crate::core::{Projection, round_half_up};

const CRORE: f64 = 10_000_000.0;
const LAKH: f64 = 100_000.0;

/// Compact rupee amount: crores and lakhs to two places, smaller values in
/// full with Indian digit grouping.
pub fn format_inr(value: f64) -> String {
    if value >= CRORE {
        format!("₹{:.2} Cr", value / CRORE)
    } else if value >= LAKH {
        format!("₹{:.2} L", value / LAKH)
    } else {
        format!("₹{}", group_indian(round_half_up(value)))
    }
}

/// Groups the last three digits, then pairs: 1234567 -> 12,34,567.
fn group_indian(value: i64) -> String {
    let digits = value.unsigned_abs().to_string();
    let sign = if value < 0 { "-" } else { "" };
    if digits.len() <= 3 {
        return format!("{sign}{digits}");
    }

    let (head, tail) = digits.split_at(digits.len() - 3);
    let mut groups = Vec::new();
    let mut end = head.len();
    while end > 0 {
        let start = end.saturating_sub(2);
        groups.push(&head[start..end]);
        end = start;
    }
    groups.reverse();
    format!("{sign}{},{tail}", groups.join(","))
}

pub fn render_schedule_table(projection: &Projection) -> String {
    let mut out = format!(
        "{:>4}  {:>14}  {:>15}  {:>15}  {:>14}\n",
        "Year", "Opening", "Withdrawal", "Interest", "Closing"
    );
    for row in &projection.schedule {
        let withdrawal = if row.withdrawal > 0 {
            format!("-{}", format_inr(row.withdrawal as f64))
        } else {
            "—".to_string()
        };
        out.push_str(&format!(
            "{:>4}  {:>14}  {:>15}  {:>15}  {:>14}\n",
            row.year,
            format_inr(row.opening as f64),
            withdrawal,
            format!("+{}", format_inr(row.interest as f64)),
            format_inr(row.closing as f64),
        ));
    }

    let summary = &projection.summary;
    out.push_str(&format!(
        "\nTotal Amount Withdrawn: {}\nProjected End Corpus:   {}\nTotal Wealth Growth:    {}\n",
        format_inr(summary.total_withdrawn as f64),
        format_inr(summary.final_balance as f64),
        format_inr(summary.wealth_gain),
    ));
    if let Some(year) = projection.depletion_year {
        out.push_str(&format!("Corpus exhausted in year {year}\n"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{ProjectionInputs, project_with_summary};

    #[test]
    fn crores_and_lakhs_use_two_decimals() {
        assert_eq!(format_inr(10_000_000.0), "₹1.00 Cr");
        assert_eq!(format_inr(25_500_000.0), "₹2.55 Cr");
        assert_eq!(format_inr(100_000.0), "₹1.00 L");
        assert_eq!(format_inr(720_000.0), "₹7.20 L");
    }

    #[test]
    fn small_amounts_use_indian_grouping() {
        assert_eq!(format_inr(0.0), "₹0");
        assert_eq!(format_inr(999.0), "₹999");
        assert_eq!(format_inr(1_000.0), "₹1,000");
        assert_eq!(format_inr(60_000.0), "₹60,000");
        assert_eq!(format_inr(99_999.4), "₹99,999");
    }

    #[test]
    fn negative_amounts_fall_through_to_grouped_form() {
        assert_eq!(format_inr(-500_000.0), "₹-5,00,000");
        assert_eq!(format_inr(-12_345_678.0), "₹-1,23,45,678");
    }

    #[test]
    fn table_lists_every_year_and_summary() {
        let projection = project_with_summary(&ProjectionInputs {
            investment: 50_000.0,
            monthly_withdrawal: 20_000.0,
            annual_rate_percent: 0.0,
            tenure_years: 2,
            defer_years: 0,
            step_up_percent: 0.0,
        });

        let table = render_schedule_table(&projection);
        let lines: Vec<&str> = table.lines().collect();
        assert!(lines[0].contains("Opening"));
        assert!(lines[1].contains("-₹50,000"));
        assert!(lines[2].contains("—"));
        assert!(table.contains("Total Amount Withdrawn: ₹50,000"));
        assert!(table.contains("Projected End Corpus:   ₹0"));
        assert!(table.contains("Total Wealth Growth:    ₹0"));
        assert!(table.contains("Corpus exhausted in year 1"));
        assert_eq!(lines.len(), 1 + 2 + 1 + 3 + 1);
    }

    #[test]
    fn table_renders_saturated_amounts() {
        let projection = project_with_summary(&ProjectionInputs {
            investment: 10_000_000.0,
            monthly_withdrawal: 60_000.0,
            annual_rate_percent: 30.0,
            tenure_years: 100,
            defer_years: 0,
            step_up_percent: 5.0,
        });

        let table = render_schedule_table(&projection);
        assert_eq!(table.lines().count(), 1 + 100 + 1 + 3);
        assert!(!table.contains("Corpus exhausted"));
    }
}
