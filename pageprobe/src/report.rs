use pageprobe_core::ComparisonBundle;

/// Print aligned per-url summary tables, one section per compared source.
pub fn print_comparison(bundle: &ComparisonBundle) {
    for source in &bundle.sources {
        println!("\n====================");
        println!("SOURCE: {}", source.label);
        println!("====================");

        println!(
            "url                                      |  mean plt (s) | median plt (s) |  mean size (MB) | median size (MB)"
        );
        println!(
            "-----------------------------------------+---------------+----------------+-----------------+-----------------"
        );

        for (url, plt) in &source.summary.durations {
            let (mean_mb, median_mb) = match source.summary.sizes.get(url) {
                Some(size) => (
                    format!("{:.3}", size.mean / 1_000_000.0),
                    format!("{:.3}", size.median / 1_000_000.0),
                ),
                None => ("-".to_string(), "-".to_string()),
            };

            println!(
                "{url:<40} | {:>13.3} | {:>14.3} | {mean_mb:>15} | {median_mb:>16}",
                plt.mean, plt.median
            );
        }
    }
}
