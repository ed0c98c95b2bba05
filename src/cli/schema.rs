//! Schema command implementation

use anyhow::Result;

use crate::schema::{Schema, SchemaAdapter};

pub fn show(schema: &Schema, adapter: &dyn SchemaAdapter) -> Result<()> {
    println!("Format: {} ({})\n", adapter.id(), adapter.description());

    for entity in schema.entities() {
        if entity.display_name != entity.name {
            println!("📦 {} ({})", entity.name, entity.display_name);
        } else {
            println!("📦 {}", entity.name);
        }
        if !entity.description.is_empty() {
            println!("   {}", entity.description);
        }

        for field in &entity.fields {
            if field.is_relationship() {
                println!(
                    "   {:<24} {:<14} → {}",
                    field.name,
                    field.field_type,
                    field.related_entity_name()
                );
            } else {
                println!("   {:<24} {}", field.name, field.field_type);
            }
        }

        for rel in schema.relationships_for(&entity.name) {
            println!(
                "   🔗 {} ({} → {})",
                rel.display_name,
                rel.source.as_deref().unwrap_or("?"),
                rel.target.as_deref().unwrap_or("?")
            );
        }
        println!();
    }

    let dangling = schema.dangling_relationships();
    if !dangling.is_empty() {
        println!("⚠️  Relationship fields pointing outside the schema:");
        for (entity, field) in dangling {
            println!(
                "   {}.{} → {}",
                entity.name,
                field.name,
                field.related_entity_name()
            );
        }
    }

    Ok(())
}
