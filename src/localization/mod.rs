use std::collections::HashMap;
use anyhow::anyhow;
use fluent::FluentArgs;
use include_dir::{include_dir, Dir};

type Error = anyhow::Error;
type FluentBundle = fluent::bundle::FluentBundle<fluent::FluentResource, intl_memoizer::concurrent::IntlLangMemoizer>;

const LOCALES: Dir = include_dir!("$CARGO_MANIFEST_DIR/locales");

pub const DEFAULT_LOCALE: &str = "en";

pub fn load_from_static_dir(fallback: &str) -> Result<Locales, Error> {
    let mut bundles = HashMap::new();

    for file in LOCALES.files() {
        let locale = file.path()
            .file_stem().ok_or(anyhow!("Invalid file name: '{}'", file.path().display()))?
            .to_str().ok_or(anyhow!("Invalid unicode filename"))?;

        let resource = fluent::FluentResource::try_new(file.contents_utf8().ok_or(anyhow!("Invalid file contents"))?.to_owned())
            .map_err(|(_, e)| anyhow!("failed to parse {:?}: {:?}", file.path(), e))?;

        let mut bundle = FluentBundle::new_concurrent(vec![locale
            .parse()
            .map_err(|e| anyhow!("invalid locale `{}`: {}", locale, e))?]);
        // isolation marks would end up verbatim in chat messages
        bundle.set_use_isolating(false);
        bundle
            .add_resource(resource)
            .map_err(|e| anyhow!("failed to add resource to bundle: {:?}", e))?;

        bundles.insert(locale.to_owned(), bundle);
    }

    Locales::new_with_bundles(fallback.to_string(), bundles)
}

pub struct Locales {
    fallback: String,
    bundles: HashMap<String, FluentBundle>,
}

impl Locales {
    pub fn new_with_bundles(fallback: String, bundles: HashMap<String, FluentBundle>) -> Result<Self, Error> {
        if !bundles.contains_key(&fallback) {
            return Err(anyhow!("fallback locale {} not found", fallback));
        }

        Ok(Self { fallback, bundles })
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    pub fn supports(&self, locale: &str) -> bool {
        self.bundles.contains_key(locale)
    }

    fn lookup(&self, locale: &str, id: &str) -> Option<String> {
        let bundle = self.bundles.get(locale)?;
        let pattern = bundle.get_message(id)?.value()?;

        Some(bundle.format_pattern(pattern, None, &mut vec![]).into_owned())
    }

    /// Fills command and option descriptions from `command-<name>` and
    /// `command-<name>-<option>` messages. The fallback locale becomes the
    /// default description, every other bundle a localization.
    pub fn apply<U, E>(&self, commands: &mut [poise::Command<U, E>]) -> Result<(), Error> {
        for command in commands {
            let id = format!("command-{}", command.name);
            command.description = Some(self.lookup(&self.fallback, &id)
                .ok_or(anyhow!("missing description '{}' in {}", id, self.fallback))?);

            for (locale, _) in self.bundles.iter().filter(|(locale, _)| **locale != self.fallback) {
                if let Some(description) = self.lookup(locale, &id) {
                    command.description_localizations.insert(locale.clone(), description);
                }
            }

            for parameter in &mut command.parameters {
                let id = format!("command-{}-{}", command.name, parameter.name);
                let Some(description) = self.lookup(&self.fallback, &id) else {
                    continue;
                };
                parameter.description = Some(description);

                for (locale, _) in self.bundles.iter().filter(|(locale, _)| **locale != self.fallback) {
                    if let Some(description) = self.lookup(locale, &id) {
                        parameter.description_localizations.insert(locale.clone(), description);
                    }
                }
            }
        }

        Ok(())
    }

    /// Resolves a localized message by searching through a cascading locale chain.
    ///
    /// For a given locale (e.g., "cs-CZ") and a defined fallback (e.g., "en"),
    /// the search candidates are prioritized as: ["cs-CZ", "cs", "en"].
    /// The first successfully resolved message is returned.
    pub fn resolve(&self, locale: &str, id: &str, args: Option<&FluentArgs>) -> Result<String, Error> {
        let mut candidates = vec![locale];
        if let Some((language, _)) = locale.split_once('-') {
            candidates.push(language);
        }
        if !candidates.contains(&self.fallback.as_str()) {
            candidates.push(self.fallback.as_str());
        }

        for candidate in candidates {
            let bundle = match self.bundles.get(candidate) {
                Some(bundle) => bundle,
                None => continue, // skips if no match
            };

            let message = match bundle.get_message(id) {
                Some(message) => message,
                None => continue, // skips if no match
            };
            let pattern = message.value().ok_or(anyhow!("message '{}' exists but has no value pattern", id))?;
            let formatted = bundle.format_pattern(pattern, args, &mut vec![]);

            return Ok(formatted.into_owned())
        }

        Err(anyhow!("no fallback found for id '{}'", id))
    }
}
