//! Department catalog and the bounded category synonym table.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Department {
    pub id: &'static str,
    /// Canonical category string specialist questions of this department carry.
    pub category: &'static str,
}

pub const DEPARTMENTS: &[Department] = &[
    Department { id: "road", category: "道路" },
    Department { id: "river", category: "河川、砂防及び海岸・海洋" },
    Department { id: "urban", category: "都市計画及び地方計画" },
    Department { id: "garden", category: "造園" },
    Department { id: "env", category: "建設環境" },
    Department { id: "steel", category: "鋼構造及びコンクリート" },
    Department { id: "soil", category: "土質及び基礎" },
    Department { id: "construction", category: "施工計画、施工設備及び積算" },
    Department { id: "water", category: "上水道及び工業用水道" },
    Department { id: "forest", category: "森林土木" },
    Department { id: "agri", category: "農業土木" },
    Department { id: "tunnel", category: "トンネル" },
];

/// Fallback pairs: a corpus category containing `stem` matches a requested
/// category that contains any of `aliases`.
const CATEGORY_SYNONYMS: &[(&str, &[&str])] = &[
    ("道路", &["道", "road"]),
    ("トンネル", &["トンネル", "tunnel"]),
    ("河川", &["河川", "civil", "river"]),
    ("土質", &["土質", "soil"]),
];

pub fn find(department_id: &str) -> Option<&'static Department> {
    DEPARTMENTS.iter().find(|d| d.id == department_id)
}

pub fn is_known(department_id: &str) -> bool {
    find(department_id).is_some()
}

/// Canonical category for a department id; unknown ids map to themselves.
pub fn category_for(department_id: &str) -> &str {
    find(department_id)
        .map(|d| d.category)
        .unwrap_or(department_id)
}

pub fn synonym_matches(corpus_category: &str, requested: &str) -> bool {
    let requested_lower = requested.to_lowercase();
    CATEGORY_SYNONYMS.iter().any(|(stem, aliases)| {
        corpus_category.contains(stem)
            && aliases
                .iter()
                .any(|alias| requested_lower.contains(&alias.to_lowercase()))
    })
}
