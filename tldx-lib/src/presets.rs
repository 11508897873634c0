//! Named TLD bundles.
//!
//! [`PresetStore`] is a generic registry of named values: an immutable set
//! of builtins plus user overrides that fully replace a builtin of the same
//! name. The TLD presets are one instance of it.

use std::collections::{BTreeMap, HashMap};

/// Builtin + user named-collection registry.
#[derive(Debug, Clone)]
pub struct PresetStore<T> {
    kind: String,
    builtin: HashMap<String, T>,
    user: HashMap<String, T>,
}

impl<T: Clone> PresetStore<T> {
    pub fn new<K: Into<String>>(kind: K, builtin: HashMap<String, T>) -> Self {
        Self {
            kind: kind.into(),
            builtin,
            user: HashMap::new(),
        }
    }

    /// Label used in listings (e.g. "tld").
    pub fn kind(&self) -> &str {
        &self.kind
    }

    /// Replace (never merge) whatever `name` resolved to before.
    pub fn set_override<K: Into<String>>(&mut self, name: K, value: T) {
        self.user.insert(name.into(), value);
    }

    /// User overrides win over builtins.
    pub fn get(&self, name: &str) -> Option<&T> {
        self.user.get(name).or_else(|| self.builtin.get(name))
    }

    /// Every preset, builtins first then user overrides, sorted by name.
    pub fn all(&self) -> BTreeMap<String, T> {
        let mut out: BTreeMap<String, T> = self
            .builtin
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        for (name, value) in &self.user {
            out.insert(name.clone(), value.clone());
        }
        out
    }

    /// Sorted preset names.
    pub fn names(&self) -> Vec<String> {
        self.all().into_keys().collect()
    }
}

/// Reserved preset name meaning "every TLD of every preset".
pub const ALL_PRESET: &str = "all";

const DEFAULT_TLD_PRESETS: &[(&str, &[&str])] = &[
    ("popular", &["com", "net", "org", "co", "io", "me", "dev", "app", "ai"]),
    ("tech", &["io", "dev", "app", "ai", "cloud", "tech", "software", "systems"]),
    ("personal", &["me", "name", "bio", "life", "xyz", "site", "blog"]),
    ("startup", &["com", "io", "ai", "co", "app", "tech", "cloud", "ly"]),
    (
        "cheap",
        &["xyz", "icu", "site", "online", "space", "fun", "store", "shop", "click"],
    ),
    ("luxury", &["luxury", "vip", "rich", "club", "jewelry", "gold"]),
    ("finance", &["finance", "money", "investments", "capital", "fund", "loans"]),
    ("design", &["design", "graphics", "studio", "art", "gallery", "ink"]),
    ("geek", &["dev", "sh", "lol", "wtf", "zip", "ninja", "tech", "codes"]),
    ("experimental", &["zip", "mov", "foo", "phd", "prof", "esq", "boo"]),
    ("geo", &["us", "uk", "ca", "de", "fr", "in", "au", "eu", "asia", "co.uk"]),
    ("security", &["security", "safe", "trust", "protection"]),
    (
        "creative",
        &[
            "art", "design", "ink", "gallery", "photo", "photography", "pics", "pictures",
            "studio", "style", "film", "show", "actor", "audio", "video", "dance", "music",
        ],
    ),
    (
        "business",
        &[
            "com", "co", "biz", "ltd", "llc", "inc", "company", "global", "international",
            "solutions", "enterprises", "group", "holdings", "corp", "agency", "network",
            "ventures", "partners",
        ],
    ),
    (
        "food",
        &[
            "cafe", "bar", "restaurant", "pub", "menu", "eat", "pizza", "organic", "recipes",
            "cooking", "kitchen", "catering", "delivery",
        ],
    ),
    (
        "social",
        &[
            "social", "community", "chat", "forum", "fans", "live", "lol", "wtf", "sucks", "fyi",
            "network", "group", "online", "link",
        ],
    ),
    (
        "shopping",
        &[
            "shop", "store", "buy", "sale", "market", "shopping", "boutique", "deals", "forsale",
            "promo", "gift", "blackfriday",
        ],
    ),
];

/// The builtin TLD presets.
pub fn default_tld_presets() -> HashMap<String, Vec<String>> {
    DEFAULT_TLD_PRESETS
        .iter()
        .map(|(name, tlds)| {
            (
                name.to_string(),
                tlds.iter().map(|t| t.to_string()).collect(),
            )
        })
        .collect()
}

/// TLD preset store with the builtins loaded and `custom` layered on top.
pub fn tld_store(custom: &HashMap<String, Vec<String>>) -> PresetStore<Vec<String>> {
    let mut store = PresetStore::new("tld", default_tld_presets());
    for (name, tlds) in custom {
        store.set_override(name.to_lowercase(), tlds.clone());
    }
    store
}

/// Sorted, deduplicated union of every preset in the store.
pub fn all_tlds(store: &PresetStore<Vec<String>>) -> Vec<String> {
    let mut tlds: Vec<String> = store.all().into_values().flatten().collect();
    tlds.sort();
    tlds.dedup();
    tlds
}

/// Resolve a preset name (leading `.` and case ignored) to its TLDs.
/// `"all"` resolves to [`all_tlds`].
pub fn resolve_tld_preset(store: &PresetStore<Vec<String>>, name: &str) -> Option<Vec<String>> {
    let name = name.trim().trim_start_matches('.').to_lowercase();
    if name == ALL_PRESET {
        return Some(all_tlds(store));
    }
    store.get(&name).cloned()
}

/// Order used when displaying a preset: shortest first, then alphabetical.
pub fn display_order(tlds: &[String]) -> Vec<String> {
    let mut sorted = tlds.to_vec();
    sorted.sort_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)));
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> PresetStore<Vec<String>> {
        tld_store(&HashMap::new())
    }

    #[test]
    fn test_builtins_present() {
        let s = store();
        assert_eq!(s.names().len(), 17);
        assert!(s.get("geo").unwrap().contains(&"co.uk".to_string()));
        assert!(s.get("nope").is_none());
    }

    #[test]
    fn test_override_replaces_builtin() {
        let mut s = store();
        let custom = vec!["zz".to_string()];
        s.set_override("popular", custom.clone());

        assert_eq!(s.get("popular"), Some(&custom));
        let all = s.all();
        assert_eq!(all.get("popular"), Some(&custom));
        assert_eq!(all.keys().filter(|k| *k == "popular").count(), 1);
        assert_eq!(all.len(), 17);
    }

    #[test]
    fn test_names_are_sorted() {
        let mut s = store();
        s.set_override("aaa", vec!["com".to_string()]);
        let names = s.names();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        assert_eq!(names[0], "aaa");
    }

    #[test]
    fn test_all_tlds_sorted_unique() {
        let tlds = all_tlds(&store());
        let mut expected = tlds.clone();
        expected.sort();
        expected.dedup();
        assert_eq!(tlds, expected);
        assert!(tlds.contains(&"blackfriday".to_string()));
    }

    #[test]
    fn test_resolve_preset_names() {
        let s = store();
        assert_eq!(resolve_tld_preset(&s, ".Tech"), s.get("tech").cloned());
        assert_eq!(resolve_tld_preset(&s, "all"), Some(all_tlds(&s)));
        assert_eq!(resolve_tld_preset(&s, "missing"), None);
    }

    #[test]
    fn test_custom_presets_from_config() {
        let mut custom = HashMap::new();
        custom.insert("Mine".to_string(), vec!["dev".to_string()]);
        let s = tld_store(&custom);
        assert_eq!(s.get("mine"), Some(&vec!["dev".to_string()]));
        assert_eq!(s.kind(), "tld");
    }

    #[test]
    fn test_display_order() {
        let tlds = vec!["dev".to_string(), "io".to_string(), "app".to_string()];
        assert_eq!(display_order(&tlds), vec!["io", "app", "dev"]);
    }
}
