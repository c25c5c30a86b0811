use crate::db::models::{Chapter, ChapterMaterial};
use crate::db::types::PackageTier;

/// A chapter together with its materials, ordered by `order_index`.
#[derive(Debug, Clone)]
pub(crate) struct ChapterContent {
    pub(crate) chapter: Chapter,
    pub(crate) materials: Vec<ChapterMaterial>,
}

pub(crate) fn is_visible(material_tier: PackageTier, user_tier: PackageTier) -> bool {
    user_tier.rank() >= material_tier.rank()
}

pub(crate) fn materials_visible_to(
    materials: &[ChapterMaterial],
    tier: PackageTier,
) -> Vec<&ChapterMaterial> {
    materials.iter().filter(|material| is_visible(material.min_package_tier, tier)).collect()
}

/// Groups materials under their chapters. Chapters keep the given order; materials
/// whose chapter is not in `chapters` are dropped.
pub(crate) fn group_by_chapter(
    chapters: Vec<Chapter>,
    materials: Vec<ChapterMaterial>,
) -> Vec<ChapterContent> {
    let mut content: Vec<ChapterContent> = chapters
        .into_iter()
        .map(|chapter| ChapterContent { chapter, materials: Vec::new() })
        .collect();

    for material in materials {
        if let Some(entry) = content.iter_mut().find(|item| item.chapter.id == material.chapter_id) {
            entry.materials.push(material);
        }
    }

    for entry in &mut content {
        entry.materials.sort_by_key(|material| material.order_index);
    }

    content
}

/// The secure view of a course: every chapter with only the materials the tier unlocks.
pub(crate) fn filter_content(content: &[ChapterContent], tier: PackageTier) -> Vec<ChapterContent> {
    content
        .iter()
        .map(|entry| ChapterContent {
            chapter: entry.chapter.clone(),
            materials: materials_visible_to(&entry.materials, tier).into_iter().cloned().collect(),
        })
        .collect()
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;
    use crate::core::time::primitive_now_utc;
    use crate::db::types::MaterialType;

    pub(crate) fn chapter(id: &str, position: i32) -> Chapter {
        let now = primitive_now_utc();
        Chapter {
            id: id.to_string(),
            course_id: "course-1".to_string(),
            title: format!("Chapter {id}"),
            description: None,
            position,
            xp_reward: 10,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn material(id: &str, chapter_id: &str, tier: PackageTier) -> ChapterMaterial {
        let now = primitive_now_utc();
        ChapterMaterial {
            id: id.to_string(),
            chapter_id: chapter_id.to_string(),
            title: format!("Material {id}"),
            description: None,
            material_type: MaterialType::Video,
            url: format!("https://cdn.example.com/{id}.mp4"),
            min_package_tier: tier,
            order_index: 0,
            created_at: now,
            updated_at: now,
        }
    }
}
