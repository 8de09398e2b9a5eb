//! Knowledge base seeding
//!
//! Populates `knowledge_base` with the curated mango farming rows the
//! fallback chat path is grounded on. Runs only when the table is empty,
//! so operator edits are never overwritten.

use crate::Result;
use sqlx::SqlitePool;
use tracing::info;

struct SeedRow {
    topic: &'static str,
    content: &'static str,
    category: &'static str,
    subcategory: Option<&'static str>,
    keywords: &'static str,
}

const SEED_ROWS: &[SeedRow] = &[
    SeedRow {
        topic: "Anthracnose",
        content: "Anthracnose is the most widespread fungal disease of mango, producing dark \
                  sunken spots on fruits and leaves with pink spore masses in humid weather. \
                  Apply copper-based fungicides or propiconazole at 10-14 day intervals during \
                  flowering, remove infected fruits, and prune for better air circulation.",
        category: "Disease Treatment",
        subcategory: Some("Fungal Diseases"),
        keywords: "anthracnose fungicide copper propiconazole spots treatment",
    },
    SeedRow {
        topic: "Powdery Mildew",
        content: "Powdery mildew coats panicles and young leaves with a white powdery growth and \
                  can destroy an entire bloom. Apply sulfur-based fungicides at first sign, \
                  repeat after 15 days, and ensure good air circulation through the canopy.",
        category: "Disease Treatment",
        subcategory: Some("Fungal Diseases"),
        keywords: "powdery mildew sulfur fungicide panicle bloom",
    },
    SeedRow {
        topic: "Bacterial Canker",
        content: "Bacterial canker shows as water-soaked lesions on leaves and raised cracked \
                  cankers on stems and fruit. Use copper-based bactericides, prune infected \
                  branches during dry weather, and disinfect tools between cuts.",
        category: "Disease Treatment",
        subcategory: Some("Bacterial Diseases"),
        keywords: "bacterial canker copper bactericide lesion pruning",
    },
    SeedRow {
        topic: "Sooty Mould",
        content: "Sooty mould is the black film that grows on honeydew excreted by sap-sucking \
                  insects. Control the hoppers, scales, and mealybugs first; the mould starves \
                  once the honeydew supply stops. A starch spray helps flake off heavy deposits.",
        category: "Disease Treatment",
        subcategory: Some("Fungal Diseases"),
        keywords: "sooty mould honeydew hopper scale mealybug",
    },
    SeedRow {
        topic: "Fruit Fly Management",
        content: "Mango fruit flies lay eggs under the fruit skin close to ripening. Use methyl \
                  eugenol pheromone traps at 6-8 per acre, collect and destroy fallen fruit, \
                  and harvest at the mature-green stage before infestation peaks.",
        category: "Pest Control",
        subcategory: Some("Fruit Flies"),
        keywords: "fruit fly trap methyl eugenol pheromone infestation",
    },
    SeedRow {
        topic: "Mango Hopper Control",
        content: "Hoppers feed on inflorescences and cause flower drop while excreting the \
                  honeydew that sooty mould grows on. Spray imidacloprid or neem oil at panicle \
                  emergence and avoid dense, unpruned canopies that shelter the insects.",
        category: "Pest Control",
        subcategory: Some("Sap Feeders"),
        keywords: "hopper imidacloprid neem flower drop honeydew",
    },
    SeedRow {
        topic: "Site Selection and Planting",
        content: "Mango prefers deep, well-drained loam with pH 5.5-7.5 and a dry period before \
                  flowering. Plant grafted saplings at 8-10 m spacing (or 3-5 m for high density \
                  orchards) at the start of the rainy season, staking and mulching each basin.",
        category: "Cultivation Practices",
        subcategory: Some("Planting"),
        keywords: "planting spacing soil drainage sapling grafted",
    },
    SeedRow {
        topic: "Irrigation and Water Management",
        content: "Young trees need watering every 2-3 days in the first summer; bearing trees \
                  should be irrigated at 50% field capacity from fruit set to maturity and kept \
                  dry for 2-3 months before flowering to stress the tree into bloom.",
        category: "Cultivation Practices",
        subcategory: Some("Irrigation"),
        keywords: "irrigation watering flowering fruit set drought",
    },
    SeedRow {
        topic: "Fertilization Program",
        content: "Apply farmyard manure plus NPK in two splits, after harvest and at fruit set. \
                  A bearing tree typically receives about 1 kg N, 0.5 kg P and 1 kg K per year; \
                  correct zinc and boron deficiencies with foliar sprays.",
        category: "Cultivation Practices",
        subcategory: Some("Nutrition"),
        keywords: "fertilizer npk manure zinc boron foliar",
    },
    SeedRow {
        topic: "Commercial Varieties",
        content: "Alphonso, Kesar, Banganapalli, and Tommy Atkins remain the leading commercial \
                  varieties. Choose by market: Alphonso and Kesar for flavor-premium domestic \
                  sales, Tommy Atkins and Kent for shipping tolerance and shelf life.",
        category: "Varieties",
        subcategory: None,
        keywords: "variety alphonso kesar banganapalli tommy atkins kent",
    },
    SeedRow {
        topic: "Harvest and Post-Harvest Handling",
        content: "Harvest at the mature-green stage with a 8-10 mm stalk to prevent sap burn, \
                  desap fruits upside down, then hot-water treat at 52 C for 5 minutes against \
                  anthracnose and store at 13 C for ripening-controlled shipment.",
        category: "Harvest and Post-Harvest",
        subcategory: None,
        keywords: "harvest desap sap burn hot water storage ripening",
    },
];

/// Seed the knowledge base if it is empty
pub async fn seed_knowledge_base(pool: &SqlitePool) -> Result<()> {
    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_base")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    for row in SEED_ROWS {
        sqlx::query(
            "INSERT INTO knowledge_base (topic, content, category, subcategory, keywords)
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(row.topic)
        .bind(row.content)
        .bind(row.category)
        .bind(row.subcategory)
        .bind(row.keywords)
        .execute(pool)
        .await?;
    }

    info!("Seeded knowledge base with {} rows", SEED_ROWS.len());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::connect_memory;

    #[tokio::test]
    async fn seeds_once_and_only_once() {
        let pool = connect_memory().await.unwrap();

        seed_knowledge_base(&pool).await.unwrap();
        let first: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_base")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(first as usize, SEED_ROWS.len());

        // Second call must not duplicate rows
        seed_knowledge_base(&pool).await.unwrap();
        let second: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM knowledge_base")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(first, second);
    }
}
