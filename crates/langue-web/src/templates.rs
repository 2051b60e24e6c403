//! Askama templates for the dashboard.

use askama::Template;
use askama_web::WebTemplate;
use langue_core::{
    DEFAULT_SOURCE_LANG, DEFAULT_TARGET_LANG, Feature, LanguageOption, source_languages,
    target_languages,
};

/// One card on the dashboard
pub struct FeatureCard {
    pub id: &'static str,
    pub title: &'static str,
    pub description: &'static str,
}

impl From<Feature> for FeatureCard {
    fn from(feature: Feature) -> Self {
        Self {
            id: feature.id(),
            title: feature.title(),
            description: feature.description(),
        }
    }
}

/// Landing page listing every feature with its form.
#[derive(Template, WebTemplate)]
#[template(path = "index.html")]
pub struct IndexTemplate {
    pub features: Vec<FeatureCard>,
    pub source_languages: Vec<LanguageOption>,
    pub target_languages: Vec<LanguageOption>,
    pub default_source: &'static str,
    pub default_target: &'static str,
    /// Characters accepted for PDF translation
    pub size_limit: usize,
}

impl IndexTemplate {
    pub fn new(size_limit: usize) -> Self {
        Self {
            features: Feature::ALL.into_iter().map(FeatureCard::from).collect(),
            source_languages: source_languages(),
            target_languages: target_languages(),
            default_source: DEFAULT_SOURCE_LANG,
            default_target: DEFAULT_TARGET_LANG,
            size_limit,
        }
    }
}
