use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum DetectionSource {
    File,
    Metadata,
    Commit,
}

impl std::fmt::Display for DetectionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionSource::File => write!(f, "file"),
            DetectionSource::Metadata => write!(f, "metadata"),
            DetectionSource::Commit => write!(f, "commit"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyDetection {
    pub name: String,
    /// Always within `[0, 1]`.
    pub confidence: f32,
    pub source: DetectionSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub repository_source: Option<String>,
    /// Repositories that contributed this detection to an aggregated profile.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub repositories: Vec<String>,
}

impl TechnologyDetection {
    pub fn new(name: impl Into<String>, confidence: f32, source: DetectionSource) -> Self {
        Self {
            name: name.into(),
            confidence: clamp_confidence(confidence),
            source,
            repository_source: None,
            repositories: Vec::new(),
        }
    }

    /// Case-insensitive identity used for deduplication.
    pub fn key(&self) -> String {
        self.name.trim().to_lowercase()
    }
}

pub fn clamp_confidence(confidence: f32) -> f32 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum TechnologyCategory {
    Languages,
    Frameworks,
    Libraries,
    Databases,
    CloudServices,
    DevOps,
    ArchitecturalPatterns,
}

impl TechnologyCategory {
    pub const ALL: [TechnologyCategory; 7] = [
        TechnologyCategory::Languages,
        TechnologyCategory::Frameworks,
        TechnologyCategory::Libraries,
        TechnologyCategory::Databases,
        TechnologyCategory::CloudServices,
        TechnologyCategory::DevOps,
        TechnologyCategory::ArchitecturalPatterns,
    ];

    /// Field name in the model's JSON contract.
    pub fn key(&self) -> &'static str {
        match self {
            TechnologyCategory::Languages => "languages",
            TechnologyCategory::Frameworks => "frameworks",
            TechnologyCategory::Libraries => "libraries",
            TechnologyCategory::Databases => "databases",
            TechnologyCategory::CloudServices => "cloudServices",
            TechnologyCategory::DevOps => "devOps",
            TechnologyCategory::ArchitecturalPatterns => "architecturalPatterns",
        }
    }

    /// Categories where models tend to hallucinate; detections must be
    /// backed by a verbatim mention in the evidence.
    pub fn requires_verbatim_evidence(&self) -> bool {
        matches!(
            self,
            TechnologyCategory::Libraries
                | TechnologyCategory::Databases
                | TechnologyCategory::CloudServices
                | TechnologyCategory::DevOps
        )
    }
}

impl std::fmt::Display for TechnologyCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TechnologyCategory::Languages => write!(f, "Languages"),
            TechnologyCategory::Frameworks => write!(f, "Frameworks"),
            TechnologyCategory::Libraries => write!(f, "Libraries"),
            TechnologyCategory::Databases => write!(f, "Databases"),
            TechnologyCategory::CloudServices => write!(f, "Cloud Services"),
            TechnologyCategory::DevOps => write!(f, "DevOps"),
            TechnologyCategory::ArchitecturalPatterns => write!(f, "Architectural Patterns"),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TechnologyProfile {
    #[serde(default)]
    pub languages: Vec<TechnologyDetection>,
    #[serde(default)]
    pub frameworks: Vec<TechnologyDetection>,
    #[serde(default)]
    pub libraries: Vec<TechnologyDetection>,
    #[serde(default)]
    pub databases: Vec<TechnologyDetection>,
    #[serde(default)]
    pub cloud_services: Vec<TechnologyDetection>,
    #[serde(default)]
    pub dev_ops: Vec<TechnologyDetection>,
    #[serde(default)]
    pub architectural_patterns: Vec<TechnologyDetection>,
}

impl TechnologyProfile {
    pub fn category(&self, category: TechnologyCategory) -> &[TechnologyDetection] {
        match category {
            TechnologyCategory::Languages => &self.languages,
            TechnologyCategory::Frameworks => &self.frameworks,
            TechnologyCategory::Libraries => &self.libraries,
            TechnologyCategory::Databases => &self.databases,
            TechnologyCategory::CloudServices => &self.cloud_services,
            TechnologyCategory::DevOps => &self.dev_ops,
            TechnologyCategory::ArchitecturalPatterns => &self.architectural_patterns,
        }
    }

    pub fn category_mut(&mut self, category: TechnologyCategory) -> &mut Vec<TechnologyDetection> {
        match category {
            TechnologyCategory::Languages => &mut self.languages,
            TechnologyCategory::Frameworks => &mut self.frameworks,
            TechnologyCategory::Libraries => &mut self.libraries,
            TechnologyCategory::Databases => &mut self.databases,
            TechnologyCategory::CloudServices => &mut self.cloud_services,
            TechnologyCategory::DevOps => &mut self.dev_ops,
            TechnologyCategory::ArchitecturalPatterns => &mut self.architectural_patterns,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (TechnologyCategory, &TechnologyDetection)> {
        TechnologyCategory::ALL
            .into_iter()
            .flat_map(move |c| self.category(c).iter().map(move |d| (c, d)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut TechnologyDetection> {
        self.languages
            .iter_mut()
            .chain(self.frameworks.iter_mut())
            .chain(self.libraries.iter_mut())
            .chain(self.databases.iter_mut())
            .chain(self.cloud_services.iter_mut())
            .chain(self.dev_ops.iter_mut())
            .chain(self.architectural_patterns.iter_mut())
    }

    pub fn len(&self) -> usize {
        TechnologyCategory::ALL
            .iter()
            .map(|c| self.category(*c).len())
            .sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn find(&self, category: TechnologyCategory, name: &str) -> Option<&TechnologyDetection> {
        let key = name.trim().to_lowercase();
        self.category(category).iter().find(|d| d.key() == key)
    }

    /// Adds a detection, keeping only the higher-confidence entry when the
    /// name is already present. Ties keep the existing entry.
    pub fn insert_max(&mut self, category: TechnologyCategory, detection: TechnologyDetection) {
        let entries = self.category_mut(category);
        let key = detection.key();
        match entries.iter_mut().find(|d| d.key() == key) {
            Some(existing) if detection.confidence > existing.confidence => *existing = detection,
            Some(_) => {}
            None => entries.push(detection),
        }
    }

    /// Merges `other` into `self` with [`TechnologyProfile::insert_max`] semantics.
    pub fn merge_max(&mut self, mut other: TechnologyProfile) {
        for category in TechnologyCategory::ALL {
            let incoming = std::mem::take(other.category_mut(category));
            for detection in incoming {
                self.insert_max(category, detection);
            }
        }
    }
}
