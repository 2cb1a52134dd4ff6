//! Static catalog of uploaded municipal documents.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentStatus {
    Active,
    Pending,
    Outdated,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentRecord {
    pub id: u32,
    pub title: String,
    pub version: String,
    pub status: DocumentStatus,
    /// Solar Hijri date as displayed, e.g. `1403/08/15`.
    pub upload_date: String,
    pub size: String,
    pub doc_type: String,
    pub category: String,
}

/// Read-only document list with a search filter.
pub struct DocumentCatalog {
    documents: Vec<DocumentRecord>,
}

impl DocumentCatalog {
    pub fn new(documents: Vec<DocumentRecord>) -> Self {
        Self { documents }
    }

    /// The four sample documents shown on the dashboard.
    pub fn demo() -> Self {
        let doc = |id, title: &str, version: &str, status, date: &str, size: &str, category: &str| {
            DocumentRecord {
                id,
                title: title.to_string(),
                version: version.to_string(),
                status,
                upload_date: date.to_string(),
                size: size.to_string(),
                doc_type: "PDF".to_string(),
                category: category.to_string(),
            }
        };
        Self::new(vec![
            doc(1, "راهنمای سامانه مالی شهرداری", "2.1.0", DocumentStatus::Active, "1403/08/15", "2.4 MB", "مالی"),
            doc(2, "قوانین شهرسازی و نظام‌نامه‌ها", "1.8.3", DocumentStatus::Pending, "1403/08/12", "5.1 MB", "حقوقی"),
            doc(3, "مستندات API سامانه‌های شهری", "3.0.1", DocumentStatus::Active, "1403/08/10", "1.8 MB", "فنی"),
            doc(4, "راهنمای عملیاتی خدمات شهری", "1.5.2", DocumentStatus::Outdated, "1403/07/28", "3.2 MB", "عملیاتی"),
        ])
    }

    pub fn all(&self) -> &[DocumentRecord] {
        &self.documents
    }

    /// Case-insensitive match on title or category. A blank term matches all.
    pub fn search(&self, term: &str) -> Vec<DocumentRecord> {
        let needle = term.trim().to_lowercase();
        if needle.is_empty() {
            return self.documents.clone();
        }
        self.documents
            .iter()
            .filter(|d| {
                d.title.to_lowercase().contains(&needle)
                    || d.category.to_lowercase().contains(&needle)
            })
            .cloned()
            .collect()
    }

    pub fn count_by_status(&self, status: DocumentStatus) -> usize {
        self.documents.iter().filter(|d| d.status == status).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_demo_has_four_documents() {
        let catalog = DocumentCatalog::demo();
        assert_eq!(catalog.all().len(), 4);
        assert_eq!(catalog.count_by_status(DocumentStatus::Active), 2);
        assert_eq!(catalog.count_by_status(DocumentStatus::Outdated), 1);
    }

    #[test]
    fn test_blank_search_returns_all() {
        let catalog = DocumentCatalog::demo();
        assert_eq!(catalog.search("").len(), 4);
        assert_eq!(catalog.search("   ").len(), 4);
    }

    #[test]
    fn test_search_by_title() {
        let catalog = DocumentCatalog::demo();
        let hits = catalog.search("شهرسازی");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 2);
    }

    #[test]
    fn test_search_by_category() {
        let catalog = DocumentCatalog::demo();
        let hits = catalog.search("فنی");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, 3);
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let catalog = DocumentCatalog::demo();
        assert_eq!(catalog.search("api").len(), 1);
    }

    #[test]
    fn test_search_no_match() {
        let catalog = DocumentCatalog::demo();
        assert!(catalog.search("nonexistent").is_empty());
    }

    #[test]
    fn test_status_serializes_lowercase() {
        let json = serde_json::to_string(&DocumentStatus::Outdated).unwrap();
        assert_eq!(json, "\"outdated\"");
    }
}
