//! `apeiron random` - Jump to a random topic.

pub async fn run() -> super::CommandResult {
    let config = super::load_config()?;
    let catalog = super::load_catalog(&config)?;

    let topic = catalog.random_topic().ok_or("The catalog is empty")?;
    let (id, title) = (topic.id.clone(), topic.title.clone());
    println!("  Random jump → {title}");

    super::show::show(&config, catalog, &id, Some(title)).await
}
