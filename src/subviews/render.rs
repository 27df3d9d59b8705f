//! Rendering children and placing their output.
//!
//! A child is rendered, then its element is appended to one of:
//! - an explicit destination given at call time
//! - the location declared in its config
//! - nowhere (left detached)
//!
//! Selector destinations resolve under the owner's element (the document body
//! for an ownerless registry), first match only, once per call.

use std::collections::HashMap;

use tracing::{trace, warn};

use crate::engine::ViewTree;
use crate::error::{Result, ViewError};
use crate::types::{ElementId, ViewId};

use super::Registry;
use super::config::Destination;
use super::source::{SubKey, SubLookup};

/// Where rendered children go.
#[derive(Debug, Clone, Default)]
pub enum Placement {
    /// Every child goes to this destination.
    AppendTo(Destination),
    /// Each child goes to its config's location, if it has one.
    #[default]
    UseLocation,
    /// Render only.
    Detached,
}

/// Options for [`Registry::render`].
#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub placement: Placement,
    /// Empty every declared location before rendering.
    pub clear_locations: bool,
}

impl RenderOptions {
    pub fn append_to(destination: impl Into<Destination>) -> Self {
        Self {
            placement: Placement::AppendTo(destination.into()),
            clear_locations: false,
        }
    }

    pub fn detached() -> Self {
        Self {
            placement: Placement::Detached,
            clear_locations: false,
        }
    }

    pub fn clearing_locations(mut self) -> Self {
        self.clear_locations = true;
        self
    }
}

/// Resolve `destination` for `view`. A selector with no match is `Ok(None)`.
pub(crate) fn resolve_destination(
    tree: &ViewTree,
    root: ElementId,
    view: ViewId,
    destination: &Destination,
) -> Result<Option<ElementId>> {
    match destination {
        Destination::Selector(selector) => {
            let found = tree.document().query_first(root, selector)?;
            if found.is_none() {
                warn!(selector = %selector, %view, "location matched no element");
            }
            Ok(found)
        }
        Destination::Element(el) => {
            if tree.document().is_alive(*el) {
                Ok(Some(*el))
            } else {
                Err(ViewError::Placement { view })
            }
        }
        Destination::Resolve(resolve) => resolve(tree, view)
            .filter(|el| tree.document().is_alive(*el))
            .map(Some)
            .ok_or(ViewError::Placement { view }),
    }
}

impl Registry {
    /// Render every child and place its output according to `options`.
    pub fn render(&self, tree: &mut ViewTree, options: RenderOptions) -> Result<&Self> {
        let views = self.ids();
        self.render_views(tree, &views, &options)
    }

    /// Render and append every child to `destination`, or to its config location if `None`.
    pub fn render_append(
        &self,
        tree: &mut ViewTree,
        destination: Option<Destination>,
    ) -> Result<&Self> {
        let placement = match destination {
            Some(destination) => Placement::AppendTo(destination),
            None => Placement::UseLocation,
        };
        self.render(
            tree,
            RenderOptions {
                placement,
                clear_locations: false,
            },
        )
    }

    /// Like [`Registry::render`], restricted to the children `key` resolves to
    /// (by type first, then as in `get`).
    pub fn render_by_key(
        &self,
        tree: &mut ViewTree,
        key: impl Into<SubKey>,
        options: RenderOptions,
    ) -> Result<&Self> {
        let key = key.into();
        let mut views = match &key {
            SubKey::Name(name) => self.get_by_type(name),
            _ => Vec::new(),
        };
        if views.is_empty() {
            views = self
                .get(tree, key)
                .map(SubLookup::into_vec)
                .unwrap_or_default();
        }
        self.render_views(tree, &views, &options)
    }

    fn render_views(
        &self,
        tree: &mut ViewTree,
        views: &[ViewId],
        options: &RenderOptions,
    ) -> Result<&Self> {
        if options.clear_locations {
            self.clear_locations(tree, None)?;
        }

        let mut cached: HashMap<String, Option<ElementId>> = HashMap::new();
        for &view in views {
            if !tree.contains(view) {
                continue;
            }
            tree.render(view)?;

            let destination = match &options.placement {
                Placement::Detached => None,
                Placement::AppendTo(destination) => Some(destination.clone()),
                Placement::UseLocation => self
                    .key_of(view)
                    .and_then(|key| self.config(&key))
                    .and_then(|config| config.location),
            };
            let (Some(destination), Some(el)) = (destination, tree.el(view)) else {
                continue;
            };

            let root = self.output_root(tree);
            let target = match &destination {
                Destination::Selector(selector) => match cached.get(selector).copied() {
                    Some(found) => found,
                    None => {
                        let found = resolve_destination(tree, root, view, &destination)?;
                        cached.insert(selector.clone(), found);
                        found
                    }
                },
                _ => resolve_destination(tree, root, view, &destination)?,
            };
            if let Some(target) = target {
                if !tree.document_mut().append(target, el) {
                    return Err(ViewError::Placement { view });
                }
                trace!(%view, %target, "placed sub-view");
            }
        }
        Ok(self)
    }

    /// Empty the declared selector/element locations of `key`'s config, or of every config.
    ///
    /// `Resolve` locations depend on a child and are skipped.
    pub fn clear_locations(&self, tree: &mut ViewTree, key: Option<&str>) -> Result<&Self> {
        let locations: Vec<Destination> = match key {
            Some(key) => self.config(key).and_then(|c| c.location).into_iter().collect(),
            None => self
                .configs()
                .into_values()
                .filter_map(|c| c.location)
                .collect(),
        };

        let root = self.output_root(tree);
        for location in locations {
            let targets = match location {
                Destination::Selector(selector) => tree.document().query(root, &selector)?,
                Destination::Element(el) => vec![el],
                Destination::Resolve(_) => continue,
            };
            for target in targets {
                tree.document_mut().clear(target);
            }
        }
        Ok(self)
    }

    fn output_root(&self, tree: &ViewTree) -> ElementId {
        self.owner()
            .and_then(|owner| tree.el(owner))
            .unwrap_or_else(|| tree.document().body())
    }
}

#[cfg(test)]
mod tests {
    use std::rc::Rc;

    use super::*;
    use crate::engine::ViewClass;
    use crate::subviews::ChildConfig;
    use crate::types::Options;

    /// Root with a `#slot` element inside its output.
    fn setup() -> (ViewTree, ViewId, Registry, ElementId) {
        let mut tree = ViewTree::new();
        let root = tree.create_plain(None).unwrap();
        let root_el = tree.el(root).unwrap();
        let body = tree.document().body();
        tree.document_mut().append(body, root_el);

        let slot = tree.document_mut().create_element("section");
        tree.document_mut().set_element_id(slot, "slot");
        tree.document_mut().append(root_el, slot);

        let subs = tree.subs(root).unwrap();
        (tree, root, subs, slot)
    }

    #[test]
    fn test_config_location_once_per_render() {
        let (mut tree, _, subs, slot) = setup();
        let class = Rc::new(ViewClass::plain("Row").tag_name("p"));
        subs.add_config(&mut tree, "row", ChildConfig::new(class).location("#slot"))
            .unwrap();
        let row = subs.create(&mut tree, "row", Options::new(), None).unwrap().unwrap();
        let row_el = tree.el(row).unwrap();

        subs.render(&mut tree, RenderOptions::default()).unwrap();
        assert_eq!(tree.document().children(slot), &[row_el]);

        subs.render(&mut tree, RenderOptions::default()).unwrap();
        assert_eq!(tree.document().children(slot), &[row_el]);
    }

    #[test]
    fn test_clear_locations_empties_before_append() {
        let (mut tree, _, subs, slot) = setup();
        subs.add_config(
            &mut tree,
            "row",
            ChildConfig::new(Rc::new(ViewClass::plain("Row"))).location("#slot"),
        )
        .unwrap();
        let stale = tree.document_mut().create_element("span");
        tree.document_mut().append(slot, stale);
        let row = subs.create(&mut tree, "row", Options::new(), None).unwrap().unwrap();

        subs.render(&mut tree, RenderOptions::default().clearing_locations())
            .unwrap();
        assert_eq!(tree.document().children(slot), &[tree.el(row).unwrap()]);
        assert!(!tree.document().is_attached(stale));
    }

    #[test]
    fn test_explicit_destination_and_detached() {
        let (mut tree, root, subs, slot) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("a"), a, None).unwrap();
        let a_el = tree.el(a).unwrap();

        subs.render(&mut tree, RenderOptions::detached()).unwrap();
        assert!(!tree.document().is_attached(a_el));

        // No config location and UseLocation leaves it unattached too
        subs.render_append(&mut tree, None).unwrap();
        assert!(!tree.document().is_attached(a_el));

        subs.render_append(&mut tree, Some(Destination::from("#slot"))).unwrap();
        assert_eq!(tree.document().parent(a_el), Some(slot));

        let root_el = tree.el(root).unwrap();
        subs.render(&mut tree, RenderOptions::append_to(root_el)).unwrap();
        assert_eq!(tree.document().parent(a_el), Some(root_el));
    }

    #[test]
    fn test_resolve_destination_must_be_live() {
        let (mut tree, _, subs, slot) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("a"), a, None).unwrap();

        subs.render(&mut tree, RenderOptions::append_to(Destination::resolve(move |_, _| Some(slot))))
            .unwrap();
        assert_eq!(tree.document().parent(tree.el(a).unwrap()), Some(slot));

        let err = subs
            .render(&mut tree, RenderOptions::append_to(Destination::resolve(|_, _| None)))
            .unwrap_err();
        assert!(matches!(err, ViewError::Placement { view } if view == a));

        let gone = tree.document_mut().create_element("div");
        tree.document_mut().discard(gone);
        let err = subs
            .render(&mut tree, RenderOptions::append_to(gone))
            .unwrap_err();
        assert!(err.is_placement());
    }

    #[test]
    fn test_append_into_own_output_fails() {
        let (mut tree, _, subs, _) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("a"), a, None).unwrap();
        let a_el = tree.el(a).unwrap();
        let inner = tree.document_mut().create_element("span");
        tree.document_mut().append(a_el, inner);

        let err = subs
            .render(&mut tree, RenderOptions::append_to(inner))
            .unwrap_err();
        assert!(matches!(err, ViewError::Placement { view } if view == a));
        assert!(!tree.document().is_attached(a_el));
    }

    #[test]
    fn test_unmatched_selector_leaves_view_detached() {
        let (mut tree, _, subs, _) = setup();
        let a = tree.create_plain(None).unwrap();
        subs.add_instance(&mut tree, Some("a"), a, None).unwrap();

        subs.render(&mut tree, RenderOptions::append_to("#nowhere")).unwrap();
        assert!(!tree.document().is_attached(tree.el(a).unwrap()));
    }

    #[test]
    fn test_render_by_key() {
        let (mut tree, _, subs, slot) = setup();
        let a = tree.create_plain(None).unwrap();
        let b = tree.create_plain(None).unwrap();
        let c = tree.create_plain(None).unwrap();
        subs.add(&mut tree, Some("item"), vec![a, b], Some(false)).unwrap();
        subs.add_instance(&mut tree, Some("other"), c, None).unwrap();

        subs.render_by_key(&mut tree, "item", RenderOptions::append_to(slot)).unwrap();
        assert_eq!(
            tree.document().children(slot),
            &[tree.el(a).unwrap(), tree.el(b).unwrap()]
        );
        assert!(!tree.document().is_attached(tree.el(c).unwrap()));

        subs.render_by_key(&mut tree, c, RenderOptions::append_to(slot)).unwrap();
        assert_eq!(tree.document().children(slot).len(), 3);
    }

    #[test]
    fn test_clear_locations_for_one_key() {
        let (mut tree, root, subs, slot) = setup();
        let root_el = tree.el(root).unwrap();
        let other = tree.document_mut().create_element("aside");
        tree.document_mut().add_class(other, "side");
        tree.document_mut().append(root_el, other);
        for el in [slot, other] {
            let filler = tree.document_mut().create_element("i");
            tree.document_mut().append(el, filler);
        }
        let class = Rc::new(ViewClass::plain("Row"));
        subs.add_config(&mut tree, "main", ChildConfig::new(class.clone()).location("#slot"))
            .unwrap();
        subs.add_config(&mut tree, "side", ChildConfig::new(class).location(".side"))
            .unwrap();

        subs.clear_locations(&mut tree, Some("side")).unwrap();
        assert_eq!(tree.document().children(slot).len(), 1);
        assert!(tree.document().children(other).is_empty());

        subs.clear_locations(&mut tree, None).unwrap();
        assert!(tree.document().children(slot).is_empty());
    }
}
