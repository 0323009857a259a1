//! Per-page `/Resources` dictionary.
//!
//! When a page inherits resources from an existing dictionary, names added
//! by the writer could clash with names already used in it. Once original
//! resources are set, every added name is translated to a synthetic `Xi<n>`
//! name that is not used by any inherited sub-dictionary.

use std::collections::{BTreeMap, BTreeSet};

use lopdf::{Dictionary as LoDictionary, Object};

/// Resource categories a page can reference from its content stream
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ResourceKind {
    Font,
    XObject,
    ColorSpace,
    Pattern,
    Shading,
    ExtGState,
    Properties,
}

impl ResourceKind {
    /// All kinds, in the order they are merged into `/Resources`
    pub const ALL: [ResourceKind; 7] = [
        ResourceKind::Font,
        ResourceKind::XObject,
        ResourceKind::ColorSpace,
        ResourceKind::Pattern,
        ResourceKind::Shading,
        ResourceKind::ExtGState,
        ResourceKind::Properties,
    ];

    /// Key of the category in the resource dictionary
    pub fn key(&self) -> &'static str {
        match self {
            ResourceKind::Font => "Font",
            ResourceKind::XObject => "XObject",
            ResourceKind::ColorSpace => "ColorSpace",
            ResourceKind::Pattern => "Pattern",
            ResourceKind::Shading => "Shading",
            ResourceKind::ExtGState => "ExtGState",
            ResourceKind::Properties => "Properties",
        }
    }

    fn index(&self) -> usize {
        *self as usize
    }
}

const PROC_SET: [&[u8]; 5] = [b"PDF", b"Text", b"ImageB", b"ImageC", b"ImageI"];

#[derive(Debug, Clone)]
pub struct PageResources {
    live: [LoDictionary; 7],
    /// Inherited resources, only set through `set_original_resources`
    original: Option<LoDictionary>,
    /// Names used by the inherited sub-dictionaries
    forbidden: BTreeSet<Vec<u8>>,
    /// source name -> translated name
    used_names: BTreeMap<Vec<u8>, Vec<u8>>,
    name_counter: u32,
    translate: bool,
}

impl Default for PageResources {
    fn default() -> Self {
        Self::new()
    }
}

impl PageResources {
    pub fn new() -> Self {
        Self {
            live: std::array::from_fn(|_| LoDictionary::new()),
            original: None,
            forbidden: BTreeSet::new(),
            used_names: BTreeMap::new(),
            name_counter: 0,
            translate: false,
        }
    }

    /// Sets the inherited resources of the page and turns on name
    /// translation. Forbidden names are the keys of the direct
    /// sub-dictionaries (`/Font`, `/XObject`, ...), not the top-level keys.
    /// `counter_start` continues the synthetic numbering of a previous page,
    /// see [`PageResources::name_counter`].
    pub fn set_original_resources(&mut self, resources: Option<&LoDictionary>, counter_start: u32) {
        self.name_counter = counter_start;
        self.translate = true;
        self.forbidden.clear();
        self.used_names.clear();
        self.original = None;

        let Some(resources) = resources else {
            return;
        };

        for (_, value) in resources.iter() {
            // referenced sub-dictionaries can't be resolved while writing
            if let Object::Dictionary(sub) = value {
                self.forbidden
                    .extend(sub.iter().map(|(name, _)| name.clone()));
            }
        }
        self.original = Some(resources.clone());
    }

    /// Next synthetic name number
    pub fn name_counter(&self) -> u32 {
        self.name_counter
    }

    fn translate_name(&mut self, name: Vec<u8>) -> Vec<u8> {
        if !self.translate {
            return name;
        }
        if let Some(translated) = self.used_names.get(&name) {
            return translated.clone();
        }
        let translated = loop {
            let candidate = format!("Xi{}", self.name_counter).into_bytes();
            self.name_counter += 1;
            if !self.forbidden.contains(&candidate) {
                break candidate;
            }
        };
        tracing::trace!(
            from = %String::from_utf8_lossy(&name),
            to = %String::from_utf8_lossy(&translated),
            "translated resource name"
        );
        self.used_names.insert(name, translated.clone());
        translated
    }

    /// Registers `reference` under `name` in the given category and returns
    /// the name the content stream has to use
    pub fn add<N: Into<Vec<u8>>>(&mut self, kind: ResourceKind, name: N, reference: Object) -> Vec<u8> {
        let name = self.translate_name(name.into());
        self.live[kind.index()].set(name.clone(), reference);
        name
    }

    pub fn add_font<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::Font, name, reference)
    }

    pub fn add_xobject<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::XObject, name, reference)
    }

    pub fn add_color<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::ColorSpace, name, reference)
    }

    pub fn add_shading<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::Shading, name, reference)
    }

    pub fn add_pattern<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::Pattern, name, reference)
    }

    pub fn add_ext_g_state<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::ExtGState, name, reference)
    }

    pub fn add_property<N: Into<Vec<u8>>>(&mut self, name: N, reference: Object) -> Vec<u8> {
        self.add(ResourceKind::Properties, name, reference)
    }

    /// Sets a default color space (`/DefaultRGB`, ...). Names are not
    /// translated, `Object::Null` removes the entry.
    pub fn add_default_color<N: Into<Vec<u8>>>(&mut self, name: N, value: Object) {
        let name = name.into();
        let colors = &mut self.live[ResourceKind::ColorSpace.index()];
        match value {
            Object::Null => {
                colors.remove(&name);
            }
            value => colors.set(name, value),
        }
    }

    /// Adds all default color spaces of `dict`, replacing existing entries
    pub fn add_default_colors(&mut self, dict: &LoDictionary) {
        let index = ResourceKind::ColorSpace.index();
        self.live[index] = merge(&self.live[index], dict);
    }

    /// Adds the default color spaces of `dict` that are not set yet
    pub fn add_default_colors_if_absent(&mut self, dict: &LoDictionary) {
        let index = ResourceKind::ColorSpace.index();
        self.live[index] = merge_if_absent(&self.live[index], dict);
    }

    /// Live entries of one category
    pub fn category(&self, kind: ResourceKind) -> &LoDictionary {
        &self.live[kind.index()]
    }

    /// Whether any category has entries. A page without resources and
    /// without inherited resources gets no `/Resources` entry.
    pub fn has_resources(&self) -> bool {
        self.live.iter().any(|d| !d.is_empty())
    }

    pub fn original_resources(&self) -> Option<&LoDictionary> {
        self.original.as_ref()
    }

    /// Builds the `/Resources` dictionary: the inherited entries, the
    /// `/ProcSet`, then every non-empty category merged over the inherited
    /// sub-dictionary of the same key.
    pub fn resources(&self) -> LoDictionary {
        let mut dict = self.original.clone().unwrap_or_default();
        dict.set(
            "ProcSet",
            Object::Array(PROC_SET.iter().map(|n| Object::Name(n.to_vec())).collect()),
        );
        for kind in ResourceKind::ALL {
            let live = &self.live[kind.index()];
            if live.is_empty() {
                continue;
            }
            let merged = match dict.get(kind.key().as_bytes()) {
                Ok(Object::Dictionary(inherited)) => merge(inherited, live),
                _ => live.clone(),
            };
            dict.set(kind.key(), Object::Dictionary(merged));
        }
        dict
    }
}

/// `base` with every entry of `overlay` set on top of it
pub fn merge(base: &LoDictionary, overlay: &LoDictionary) -> LoDictionary {
    let mut merged = base.clone();
    for (key, value) in overlay.iter() {
        merged.set(key.clone(), value.clone());
    }
    merged
}

/// `base` plus the entries of `overlay` whose keys are not in `base`
pub fn merge_if_absent(base: &LoDictionary, overlay: &LoDictionary) -> LoDictionary {
    let mut merged = base.clone();
    for (key, value) in overlay.iter() {
        if !merged.has(key) {
            merged.set(key.clone(), value.clone());
        }
    }
    merged
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    fn inherited() -> LoDictionary {
        let fonts = LoDictionary::from_iter(vec![
            ("Xi0", Object::Reference((10, 0))),
            ("Xi2", Object::Reference((11, 0))),
        ]);
        let xobjects = LoDictionary::from_iter(vec![("Im1", Object::Reference((12, 0)))]);
        LoDictionary::from_iter(vec![
            ("Font", Object::Dictionary(fonts)),
            ("XObject", Object::Dictionary(xobjects)),
            // top-level keys are category names, never forbidden
            ("Xi1", Object::Dictionary(LoDictionary::new())),
        ])
    }

    #[test]
    fn names_pass_through_without_original_resources() {
        let mut res = PageResources::new();
        assert!(!res.has_resources());
        assert_eq!(res.add_font("F1", Object::Reference((3, 0))), b"F1".to_vec());
        assert!(res.has_resources());
    }

    #[test]
    fn translated_names_are_memoized() {
        let mut res = PageResources::new();
        res.set_original_resources(Some(&inherited()), 0);
        let first = res.add_font("F1", Object::Reference((3, 0)));
        let again = res.add_font("F1", Object::Reference((3, 0)));
        assert_eq!(first, again);
    }

    #[test]
    fn translated_names_avoid_forbidden_names() {
        let mut res = PageResources::new();
        res.set_original_resources(Some(&inherited()), 0);
        let names = vec![
            res.add_font("F1", Object::Reference((3, 0))),
            res.add_xobject("Img", Object::Reference((4, 0))),
            res.add_ext_g_state("GS", Object::Reference((5, 0))),
        ];
        // Xi0 and Xi2 are used by the inherited /Font dictionary
        assert_eq!(names, vec![b"Xi1".to_vec(), b"Xi3".to_vec(), b"Xi4".to_vec()]);
        assert_eq!(res.name_counter(), 5);
    }

    #[test]
    fn distinct_names_stay_distinct() {
        let mut res = PageResources::new();
        res.set_original_resources(None, 7);
        let a = res.add_font("A", Object::Reference((3, 0)));
        let b = res.add_font("B", Object::Reference((4, 0)));
        assert_ne!(a, b);
        assert_eq!(a, b"Xi7".to_vec());
    }

    #[test]
    fn resources_merge_over_inherited() {
        let mut res = PageResources::new();
        res.set_original_resources(Some(&inherited()), 0);
        let name = res.add_font("F1", Object::Reference((3, 0)));
        res.add_default_color("DefaultRGB", Object::Name(b"DeviceRGB".to_vec()));

        let dict = res.resources();
        let keys = dict.iter().map(|(k, _)| k.clone()).collect::<Vec<_>>();
        assert_eq!(
            keys,
            vec![
                b"Font".to_vec(),
                b"XObject".to_vec(),
                b"Xi1".to_vec(),
                b"ProcSet".to_vec(),
                b"ColorSpace".to_vec(),
            ]
        );
        let fonts = dict.get(b"Font").unwrap().as_dict().unwrap();
        assert_eq!(fonts.len(), 3);
        assert_eq!(fonts.get(&name).unwrap(), &Object::Reference((3, 0)));
        assert_eq!(fonts.get(b"Xi0").unwrap(), &Object::Reference((10, 0)));
    }

    #[test]
    fn default_colors() {
        let mut res = PageResources::new();
        res.add_default_color("DefaultGray", Object::Name(b"DeviceGray".to_vec()));
        let overlay = LoDictionary::from_iter(vec![
            ("DefaultGray", Object::Name(b"CalGray".to_vec())),
            ("DefaultRGB", Object::Name(b"DeviceRGB".to_vec())),
        ]);
        res.add_default_colors_if_absent(&overlay);
        let colors = res.category(ResourceKind::ColorSpace);
        assert_eq!(colors.get(b"DefaultGray").unwrap(), &Object::Name(b"DeviceGray".to_vec()));
        assert_eq!(colors.len(), 2);

        res.add_default_colors(&overlay);
        let colors = res.category(ResourceKind::ColorSpace);
        assert_eq!(colors.get(b"DefaultGray").unwrap(), &Object::Name(b"CalGray".to_vec()));

        res.add_default_color("DefaultRGB", Object::Null);
        assert_eq!(res.category(ResourceKind::ColorSpace).len(), 1);
    }
}
