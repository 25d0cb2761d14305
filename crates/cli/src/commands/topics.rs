//! `apeiron topics` - List or search the catalog.

use std::fmt::Write;

use apeiron_core::topic::Topic;

pub async fn run(search: Option<String>) -> super::CommandResult {
    let config = super::load_config()?;
    let catalog = super::load_catalog(&config)?;

    let topics = catalog.search(search.as_deref().unwrap_or(""));
    if topics.is_empty() {
        println!("  Nothing in the archive matches that. Try `apeiron show <id>` to summon it.");
        return Ok(());
    }

    print!("{}", render(&topics));
    Ok(())
}

fn render(topics: &[&Topic]) -> String {
    let id_width = topics.iter().map(|t| t.id.len()).max().unwrap_or(0);
    let mut out = String::new();
    for topic in topics {
        let _ = writeln!(
            out,
            "  {:<id_width$}  {:<9}  {}",
            topic.id,
            topic.difficulty.to_string(),
            topic.title,
        );
        let _ = writeln!(out, "  {:<id_width$}  {:<9}  {}", "", "", topic.short_description);
    }
    out
}
