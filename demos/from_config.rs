//! Example building a loader from a YAML config.
//!
//! Run with: cargo run --example from_config --features yaml

use prloader::{ConfigFormat, LoaderConfig, build_loader_from_config, from_fn};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let yaml = r#"
name: pull-requests
max_cached: 5
thread_affinity: error
"#;

    let config = LoaderConfig::parse(ConfigFormat::Yaml, yaml)?;
    println!("Parsed config: {config:?}");

    let loader = build_loader_from_config(
        &config,
        from_fn(|number| Ok::<_, std::io::Error>(format!("data for #{number}"))),
    )?;

    for number in [10, 11, 10] {
        println!("#{number}: {}", loader.get_data_provider(number)?);
    }
    println!("{loader:?}");

    Ok(())
}
