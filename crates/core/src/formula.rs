//! Hyperlink formula written into the change log's Cells column
//!
//! The formula resolves the live address of the captured range so the link
//! keeps working after rows or columns move, and falls back to a static link
//! to the original address when the dynamic form errors.

/// Build the link formula for a captured range
///
/// `sheet` is the worksheet name, `address` the sheet-local address (`A1:B2`)
/// and `full_address` the host's qualified address (`Sheet1!A1:B2`).
pub fn hyperlink_formula(sheet: &str, address: &str, full_address: &str) -> String {
    let static_label = address.replacen('$', "", 1);
    format!(
        r##"= LET(rng, {full_address}, sht, TEXTAFTER(CELL("filename", rng), "]"), addr, IF(ROWS(rng) + COLUMNS(rng)=2, ADDRESS(ROW(rng), COLUMN(rng)), ADDRESS(MIN(ROW(rng)), MIN(COLUMN(rng))) & ":" & ADDRESS(MAX(ROW(rng)), MAX(COLUMN(rng)))), dynamic_link, HYPERLINK("#'" & sht & "'!" & addr, "↗️" & SUBSTITUTE(addr, "$", "")), IFERROR(dynamic_link, HYPERLINK("#'{sheet}'!{address}","[static!] ↗️{static_label}")))"##
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_formula_text() {
        let formula = hyperlink_formula("Inputs", "B2:C4", "Inputs!B2:C4");

        assert!(formula.starts_with("= LET(rng, Inputs!B2:C4, sht, "));
        assert!(formula.contains(r##"HYPERLINK("#'" & sht & "'!" & addr, "↗️" & SUBSTITUTE(addr, "$", ""))"##));
        assert!(formula.ends_with(r##"IFERROR(dynamic_link, HYPERLINK("#'Inputs'!B2:C4","[static!] ↗️B2:C4")))"##));
    }

    #[test]
    fn test_static_label_drops_first_anchor_only() {
        let formula = hyperlink_formula("Calc", "$A$1", "Calc!$A$1");
        assert!(formula.ends_with(r##""[static!] ↗️A$1")))"##));
        assert!(formula.contains(r##"HYPERLINK("#'Calc'!$A$1","##));
    }
}
