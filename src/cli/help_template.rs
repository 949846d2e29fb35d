use indoc::indoc;

// Help text template with placeholder
pub const HELP_TEMPLATE: &str = indoc! {r#"
    Examples:
      # Merging a metrics directory into a scrape
      %BINARY_NAME% /var/run/metrics aggregate

      # Dumping one worker's counter file
      %BINARY_NAME% /var/run/metrics entries counter_1234-0.db

      # Dumping with strict parsing (diagnose corruption)
      %BINARY_NAME% /var/run/metrics entries counter_1234-0.db --strict

      # Showing header and size information
      %BINARY_NAME% /var/run/metrics info gauge_max_1234-0.db
"#};
