//! Example wiring a loader to a project scope and a UI panel.
//!
//! Run with: cargo run --example basic_loader

use std::sync::Arc;

use prloader::{Disposable, LoaderBuilder, PrNumber};

#[derive(Debug)]
struct PullRequestDetails {
    number: PrNumber,
    title: String,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .init();

    let project = Disposable::named("project");

    let loader = LoaderBuilder::new(|number: PrNumber, scope: &Disposable| -> Result<_, prloader::BoxError> {
        println!("loading #{number}");
        scope.register(move || println!("releasing #{number}"))?;
        Ok(PullRequestDetails {
            number,
            title: format!("Pull request #{number}"),
        })
    })
    .with_name("pull-requests")
    .with_max_cached(2)
    .with_parent(&project)
    .build()?;

    let panel = project.child("details-panel")?;
    loader.add_invalidation_listener(&panel, |number| {
        println!("panel: #{number} went stale");
    })?;

    let first = loader.get_data_provider(1)?;
    let again = loader.get_data_provider(1)?;
    println!("{first:?} cached: {}", Arc::ptr_eq(&first, &again));

    // A third pull request pushes the least recently used one out.
    loader.get_data_provider(2)?;
    loader.get_data_provider(3)?;
    println!("cached numbers: {:?}", loader.cached_numbers());

    loader.invalidate_all_data()?;
    println!("after invalidation: {:?}", loader.find_data_provider(1)?.map(|p| p.title.clone()));

    project.dispose();
    println!("loader disposed: {}", loader.is_disposed());

    Ok(())
}
