use anyhow::{anyhow, Result};
use fluent_bundle::concurrent::FluentBundle;
use fluent_bundle::{FluentArgs, FluentResource, FluentValue};
use std::sync::LazyLock;
use unic_langid::LanguageIdentifier;

/// English messages, compiled into the binary
const EN_MESSAGES: &str = include_str!("../locales/en/main.ftl");

/// Localization manager for shopping-list labels and messages
pub struct LocalizationManager {
    bundle: FluentBundle<FluentResource>,
}

impl LocalizationManager {
    /// Create a new localization manager with the embedded English messages
    pub fn new() -> Result<Self> {
        let locale: LanguageIdentifier = "en".parse()?;
        let bundle = Self::create_bundle(locale, EN_MESSAGES)?;
        Ok(Self { bundle })
    }

    /// Create a fluent bundle for a locale from FTL source
    fn create_bundle(
        locale: LanguageIdentifier,
        source: &str,
    ) -> Result<FluentBundle<FluentResource>> {
        let mut bundle = FluentBundle::new_concurrent(vec![locale]);
        // Placeholders end up in plain-text labels; no bidi isolation marks
        bundle.set_use_isolating(false);

        let resource = FluentResource::try_new(source.to_string())
            .map_err(|(_, errors)| anyhow!("Invalid FTL resource: {errors:?}"))?;
        bundle
            .add_resource(resource)
            .map_err(|errors| anyhow!("Failed to add FTL resource: {errors:?}"))?;

        Ok(bundle)
    }

    /// Get a localized message
    pub fn get_message(&self, key: &str, args: Option<&FluentArgs>) -> String {
        let msg = match self.bundle.get_message(key) {
            Some(msg) => msg,
            None => return format!("Missing translation: {key}"),
        };

        let pattern = match msg.value() {
            Some(pattern) => pattern,
            None => return format!("Missing value for key: {key}"),
        };

        let mut errors = vec![];
        self.bundle
            .format_pattern(pattern, args, &mut errors)
            .into_owned()
    }

    /// Get a localized message with simple string arguments
    pub fn get_message_with_args(&self, key: &str, args: &[(&str, &str)]) -> String {
        let mut fluent_args = FluentArgs::new();
        for (name, value) in args {
            fluent_args.set(*name, FluentValue::from(*value));
        }
        self.get_message(key, Some(&fluent_args))
    }
}

/// Global localization instance
static LOCALIZATION_MANAGER: LazyLock<LocalizationManager> = LazyLock::new(|| {
    LocalizationManager::new().expect("Embedded English messages should be valid")
});

/// Convenience function to get a localized message
pub fn t(key: &str) -> String {
    LOCALIZATION_MANAGER.get_message(key, None)
}

/// Convenience function to get a localized message with arguments
pub fn t_args(key: &str, args: &[(&str, &str)]) -> String {
    LOCALIZATION_MANAGER.get_message_with_args(key, args)
}
