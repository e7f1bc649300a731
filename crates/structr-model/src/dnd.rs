//! Drag and Drop
//!
//! Validates drop targets while a node is dragged over the trees and turns a
//! legal drop into exactly one transport mutation. At most one session is
//! active; every session carries a token so events of an older session are
//! ignored.

use std::collections::BTreeSet;
use std::rc::Rc;

use tracing::{debug, trace};

use crate::context::StructrModel;
use crate::dom::Dom;
use crate::entity::{payload_id, Entity, EntityKind, Properties, Scope, TreeFamily};
use crate::error::ModelResult;
use crate::transport::{Anchor, Mutation, RelativePosition};

pub const CLASS_DRAGGING: &str = "dragging";
pub const CLASS_DROP_FORBIDDEN: &str = "drop-forbidden";
pub const CLASS_DROP_NO_CHILDREN: &str = "drop-no-children";
pub const CLASS_DROP_MOVE: &str = "drop-move";
pub const CLASS_DROP_COPY: &str = "drop-copy";
pub const CLASS_DROP_BEFORE: &str = "drop-before";
pub const CLASS_DROP_AFTER: &str = "drop-after";

/// Identifies one drag session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DragToken(u64);

impl DragToken {
    pub fn value(self) -> u64 {
        self.0
    }

    /// Rebuild a token that crossed a JS boundary
    pub fn from_value(value: u64) -> Self {
        Self(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropTarget {
    /// Become the last child of this entity
    Node(String),
    /// Become a sibling next to the anchor's reference
    Relative(Anchor),
    /// Tree root of the file and content trees
    Root,
    Favorites,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropEffect {
    Move,
    Copy,
}

impl DropEffect {
    pub fn cue(self) -> &'static str {
        match self {
            DropEffect::Move => CLASS_DROP_MOVE,
            DropEffect::Copy => CLASS_DROP_COPY,
        }
    }
}

/// Why a drop target is illegal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    /// Target lies inside the dragged subtree
    Cycle,
    /// Target kind takes no children, only siblings
    NoChildren,
    Incompatible,
    NotResident,
}

impl Rejection {
    pub fn cue(self) -> &'static str {
        match self {
            Rejection::NoChildren => CLASS_DROP_NO_CHILDREN,
            Rejection::Cycle | Rejection::Incompatible | Rejection::NotResident => {
                CLASS_DROP_FORBIDDEN
            }
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropVerdict {
    Allowed(DropEffect),
    Forbidden(Rejection),
}

impl DropVerdict {
    pub fn is_allowed(self) -> bool {
        matches!(self, DropVerdict::Allowed(_))
    }

    pub fn cue(self) -> &'static str {
        match self {
            DropVerdict::Allowed(effect) => effect.cue(),
            DropVerdict::Forbidden(rejection) => rejection.cue(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum DropOutcome {
    /// Illegal target; nothing was sent
    Rejected(Rejection),
    /// Token of a session that is no longer active
    Stale,
    Applied {
        mutation: Mutation,
        /// Entity created by a copy, clone or widget drop
        created: Option<String>,
    },
}

/// Called once per drop with its outcome
pub type DropCallback = Rc<dyn Fn(&DropOutcome)>;

/// Sibling insertion point offered while hovering
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelativeMarker {
    pub node: String,
    pub anchor: Anchor,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hover {
    pub verdict: DropVerdict,
    pub markers: Vec<RelativeMarker>,
}

pub(crate) struct DragSession {
    token: DragToken,
    entity_id: String,
    dragged_node: Option<String>,
    /// Classes put on nodes during hover, removed before the next hover
    cues: BTreeSet<(String, &'static str)>,
    on_drop: Option<DropCallback>,
}

impl<D: Dom> StructrModel<D> {
    /// Start dragging `id`. Any previous session is discarded.
    pub fn drag_start(&self, id: &str, on_drop: Option<DropCallback>) -> Option<DragToken> {
        if !self.is_resident(id) {
            return None;
        }
        self.reset_drag();

        let token = DragToken(self.next_drag_token.get());
        self.next_drag_token.set(token.0 + 1);
        let dragged_node = self.node_of(id);
        if let Some(node) = &dragged_node {
            self.dom.borrow_mut().add_class(node, CLASS_DRAGGING);
        }
        *self.drag.borrow_mut() = Some(DragSession {
            token,
            entity_id: id.to_string(),
            dragged_node,
            cues: BTreeSet::new(),
            on_drop,
        });
        debug!(%id, token = token.0, "drag started");
        Some(token)
    }

    /// Token and entity id of the active session
    pub fn active_drag(&self) -> Option<(DragToken, String)> {
        let drag = self.drag.borrow();
        drag.as_ref().map(|s| (s.token, s.entity_id.clone()))
    }

    /// Evaluate `target` for the active session and show the verdict on it.
    /// Returns `None` for a stale token.
    pub fn drag_over(&self, token: DragToken, target: &DropTarget) -> Option<Hover> {
        let dragged = self.session_entity(token)?;
        self.clear_cues();

        let verdict = self.evaluate(&dragged, target);
        let mut cues = Vec::new();
        let target_node = match target {
            DropTarget::Node(id) => self.node_of(id),
            DropTarget::Relative(anchor) => self.node_of(&anchor.reference_id),
            DropTarget::Root | DropTarget::Favorites => None,
        };
        if let Some(node) = target_node {
            cues.push((node, verdict.cue()));
        }

        let markers = match target {
            DropTarget::Node(hovered)
                if self.config.relative_drop_targets
                    && verdict != DropVerdict::Forbidden(Rejection::Cycle)
                    && self.family_of(&dragged) == Some(TreeFamily::Page) =>
            {
                self.relative_markers(&dragged, hovered)
            }
            _ => Vec::new(),
        };
        for marker in &markers {
            let class = match marker.anchor.position {
                RelativePosition::Before => CLASS_DROP_BEFORE,
                RelativePosition::After => CLASS_DROP_AFTER,
            };
            cues.push((marker.node.clone(), class));
        }

        {
            let mut dom = self.dom.borrow_mut();
            for (node, class) in &cues {
                dom.add_class(node, class);
            }
        }
        if let Some(session) = self.drag.borrow_mut().as_mut() {
            session.cues.extend(cues);
        }
        trace!(%dragged, ?target, ?verdict, "drag over");
        Some(Hover { verdict, markers })
    }

    /// Drop the dragged entity on `target`. An illegal target makes no
    /// transport call and leaves store and DOM unchanged.
    pub async fn drop(&self, token: DragToken, target: DropTarget) -> ModelResult<DropOutcome> {
        let session = {
            let drag = self.drag.borrow();
            drag.as_ref()
                .filter(|s| s.token == token)
                .map(|s| (s.entity_id.clone(), s.on_drop.clone()))
        };
        let Some((dragged, on_drop)) = session else {
            debug!(token = token.0, "drop from stale session ignored");
            return Ok(DropOutcome::Stale);
        };
        self.clear_cues();

        let outcome = match self.evaluate(&dragged, &target) {
            DropVerdict::Forbidden(rejection) => {
                debug!(%dragged, ?target, ?rejection, "drop rejected");
                DropOutcome::Rejected(rejection)
            }
            DropVerdict::Allowed(effect) => match self.plan(&dragged, &target, effect) {
                None => DropOutcome::Rejected(Rejection::Incompatible),
                Some(mutation) => self.apply_drop(&dragged, mutation).await?,
            },
        };

        if let Some(callback) = on_drop {
            callback(&outcome);
        }
        Ok(outcome)
    }

    /// End the session of `token`. Visual cues are cleared whatever the drop
    /// did; a stale token changes nothing.
    pub fn drag_end(&self, token: DragToken) -> bool {
        let active = self.drag.borrow().as_ref().map(|s| s.token) == Some(token);
        if !active {
            trace!(token = token.0, "stale drag end ignored");
            return false;
        }
        self.reset_drag();
        true
    }

    /// Discard the active session and its cues
    pub fn reset_drag(&self) {
        self.clear_cues();
        let session = self.drag.borrow_mut().take();
        if let Some(node) = session.and_then(|s| s.dragged_node) {
            self.dom.borrow_mut().remove_class(&node, CLASS_DRAGGING);
        }
    }

    /// Legality of dropping `dragged` on `target`
    pub fn evaluate(&self, dragged: &str, target: &DropTarget) -> DropVerdict {
        use DropVerdict::{Allowed, Forbidden};

        let Some(kind) = self.read(dragged, Entity::kind) else {
            return Forbidden(Rejection::NotResident);
        };
        let Some(family) = kind.family() else {
            return Forbidden(Rejection::Incompatible);
        };

        let (target_id, relative) = match target {
            DropTarget::Root => {
                return match family {
                    TreeFamily::File | TreeFamily::ContentContainer => Allowed(DropEffect::Move),
                    _ => Forbidden(Rejection::Incompatible),
                };
            }
            DropTarget::Favorites => {
                return match kind {
                    EntityKind::File | EntityKind::Image => Allowed(DropEffect::Move),
                    _ => Forbidden(Rejection::Incompatible),
                };
            }
            DropTarget::Node(id) => (id.as_str(), false),
            DropTarget::Relative(anchor) => (anchor.reference_id.as_str(), true),
        };

        let Some(target_kind) = self.read(target_id, Entity::kind) else {
            return Forbidden(Rejection::NotResident);
        };
        if self.is_within(target_id, dragged) {
            return Forbidden(Rejection::Cycle);
        }
        if target_kind.family() != Some(family) {
            return Forbidden(Rejection::Incompatible);
        }

        match family {
            TreeFamily::Page => self.evaluate_page_drop(dragged, kind, target_id, target_kind, relative),
            TreeFamily::File | TreeFamily::ContentContainer if relative => {
                Forbidden(Rejection::Incompatible)
            }
            TreeFamily::File => match target_kind {
                EntityKind::Folder => Allowed(DropEffect::Move),
                _ => Forbidden(Rejection::NoChildren),
            },
            TreeFamily::ContentContainer => match target_kind {
                EntityKind::ContentContainer => Allowed(DropEffect::Move),
                _ => Forbidden(Rejection::NoChildren),
            },
            TreeFamily::Security if relative => Forbidden(Rejection::Incompatible),
            // membership adds a link; the dragged entity keeps its place
            TreeFamily::Security => match target_kind {
                EntityKind::Group => Allowed(DropEffect::Copy),
                _ => Forbidden(Rejection::NoChildren),
            },
        }
    }

    fn evaluate_page_drop(
        &self,
        dragged: &str,
        kind: EntityKind,
        target_id: &str,
        target_kind: EntityKind,
        relative: bool,
    ) -> DropVerdict {
        use DropVerdict::{Allowed, Forbidden};

        if kind == EntityKind::Page || target_kind == EntityKind::Widget {
            return Forbidden(Rejection::Incompatible);
        }
        let target_page = if relative {
            let Some(parent) = self.read(target_id, Entity::logical_parent_id).flatten() else {
                return Forbidden(Rejection::Incompatible);
            };
            self.read(&parent, Entity::page_id).flatten()
        } else {
            if target_kind == EntityKind::Content {
                return Forbidden(Rejection::NoChildren);
            }
            self.read(target_id, Entity::page_id).flatten()
        };
        if kind == EntityKind::Widget {
            return Allowed(DropEffect::Copy);
        }

        match self.read(dragged, Entity::page_id).flatten() {
            None => Allowed(DropEffect::Move),
            Some(page) if Some(&page) == target_page.as_ref() => Allowed(DropEffect::Move),
            Some(_) => Allowed(DropEffect::Copy),
        }
    }

    /// Mutation for an allowed drop
    fn plan(&self, dragged: &str, target: &DropTarget, effect: DropEffect) -> Option<Mutation> {
        let (kind, page, shared) =
            self.read(dragged, |e| (e.kind(), e.page_id(), e.is_shared_component()))?;
        let id = dragged.to_string();

        match kind.family()? {
            TreeFamily::Page => {
                let (parent_id, anchor) = match target {
                    DropTarget::Node(parent) => (parent.clone(), None),
                    DropTarget::Relative(anchor) => (
                        self.read(&anchor.reference_id, Entity::logical_parent_id)
                            .flatten()?,
                        Some(anchor.clone()),
                    ),
                    DropTarget::Root | DropTarget::Favorites => return None,
                };
                let page_id = self.read(&parent_id, Entity::page_id).flatten();

                let mutation = if kind == EntityKind::Widget {
                    Mutation::AppendWidget {
                        widget_id: id,
                        parent_id,
                        page_id,
                        anchor,
                    }
                } else if page.is_some() && shared {
                    Mutation::CloneComponent {
                        id,
                        parent_id,
                        anchor,
                    }
                } else if page.is_none() || effect == DropEffect::Move {
                    match anchor {
                        Some(anchor) => Mutation::InsertRelative {
                            id,
                            parent_id,
                            anchor,
                        },
                        None => Mutation::AppendChild {
                            id,
                            parent_id,
                            page_id,
                        },
                    }
                } else {
                    Mutation::CloneNode {
                        id,
                        parent_id,
                        anchor,
                        deep: true,
                    }
                };
                Some(mutation)
            }
            TreeFamily::File => match target {
                DropTarget::Node(folder) => Some(Mutation::MoveToFolder {
                    id,
                    folder_id: Some(folder.clone()),
                }),
                DropTarget::Root => Some(Mutation::MoveToFolder { id, folder_id: None }),
                DropTarget::Favorites => Some(Mutation::AddFavorite { id }),
                DropTarget::Relative(_) => None,
            },
            TreeFamily::ContentContainer => match target {
                DropTarget::Node(container) => Some(Mutation::MoveToContainer {
                    id,
                    container_id: Some(container.clone()),
                }),
                DropTarget::Root => Some(Mutation::MoveToContainer {
                    id,
                    container_id: None,
                }),
                _ => None,
            },
            TreeFamily::Security => match target {
                DropTarget::Node(group) => Some(Mutation::AddMember {
                    group_id: group.clone(),
                    member_id: id,
                }),
                _ => None,
            },
        }
    }

    async fn apply_drop(&self, dragged: &str, mutation: Mutation) -> ModelResult<DropOutcome> {
        let (old_parent, unattached) = self
            .read(dragged, |e| {
                let unattached = e.kind().family() == Some(TreeFamily::Page)
                    && e.page_id().is_none()
                    && !e.is_shared_component();
                (e.logical_parent_id(), unattached)
            })
            .unwrap_or((None, false));

        debug!(%dragged, ?mutation, "applying drop");
        let created = self.transport.apply(&mutation).await?;
        let created = self.sync_after_drop(&mutation, old_parent, created).await?;

        if unattached && !mutation.creates_entity() {
            self.refresh_unattached().await?;
        }
        Ok(DropOutcome::Applied { mutation, created })
    }

    /// Bring the touched parents and the moved or created entity up to date
    async fn sync_after_drop(
        &self,
        mutation: &Mutation,
        old_parent: Option<String>,
        created: Option<Properties>,
    ) -> ModelResult<Option<String>> {
        let new_parent = target_parent(mutation);
        let children = ["children".to_string()];

        if let Some(payload) = created {
            let id = payload_id(&payload)?;
            if let Some(parent) = new_parent.filter(|p| self.is_resident(p)) {
                self.apply_partial_update(&parent, &children).await?;
            }
            self.create_or_update_from_payload(payload, None, true).await?;
            return Ok(Some(id));
        }

        let parents: BTreeSet<String> = old_parent.into_iter().chain(new_parent).collect();
        for parent in parents.iter().filter(|p| self.is_resident(p)) {
            self.apply_partial_update(parent, &children).await?;
        }

        let subject = mutation.subject().to_string();
        if self.is_resident(&subject) {
            let page_before = self.read(&subject, Entity::page_id).flatten();
            let mut keys = vec!["parent".to_string(), "pageId".to_string()];
            if matches!(mutation, Mutation::AddFavorite { .. }) {
                keys.push("isFavorite".to_string());
            }
            self.apply_partial_update(&subject, &keys).await?;
            if self.read(&subject, Entity::page_id).flatten() != page_before {
                self.spread_page_id(&subject);
            }
            match mutation {
                Mutation::AddMember { .. } => {}
                Mutation::AddFavorite { .. } => {
                    self.append_in(&subject, &Scope::Favorite, None);
                }
                // reorders within one parent change no placement key
                _ if self.node_of(&subject).is_some() => {
                    self.append(&subject, None);
                }
                _ => {}
            }
        }
        Ok(None)
    }

    /// `candidate` is `ancestor` or lies below it, by DOM containment or by
    /// the parent references of resident entities
    fn is_within(&self, candidate: &str, ancestor: &str) -> bool {
        if candidate == ancestor {
            return true;
        }
        if let (Some(outer), Some(inner)) = (self.node_of(ancestor), self.node_of(candidate)) {
            if self.dom.borrow().contains(&outer, &inner) {
                return true;
            }
        }

        let mut seen = BTreeSet::new();
        let mut current = self.read(candidate, Entity::logical_parent_id).flatten();
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            if !seen.insert(id.clone()) {
                break;
            }
            current = self.read(&id, Entity::logical_parent_id).flatten();
        }

        self.resident_descendants(ancestor)
            .iter()
            .any(|d| d == candidate)
    }

    /// Sibling insertion points around the nearest ancestor-or-self of
    /// `hovered` that has entity siblings outside the dragged subtree
    fn relative_markers(&self, dragged: &str, hovered: &str) -> Vec<RelativeMarker> {
        let dragged_node = self.node_of(dragged);
        let mut seen = BTreeSet::new();
        let mut current = Some(hovered.to_string());

        while let Some(id) = current {
            if !seen.insert(id.clone()) || self.read(&id, Entity::kind) == Some(EntityKind::Page) {
                break;
            }
            let Some(node) = self.node_of(&id) else {
                break;
            };

            let dom = self.dom.borrow();
            let outside = |key: &String| {
                dragged_node
                    .as_deref()
                    .map_or(true, |d| !dom.contains(d, key))
            };
            if outside(&node) {
                let sibling = |key: Option<String>| {
                    key.filter(|k| outside(k))
                        .and_then(|k| dom.entity_of(&k).map(|entity| (k, entity)))
                };
                let mut markers = Vec::new();
                if let Some((node, entity)) = sibling(dom.previous_sibling(&node)) {
                    markers.push(RelativeMarker {
                        node,
                        anchor: Anchor::after(entity),
                    });
                }
                if let Some((node, entity)) = sibling(dom.next_sibling(&node)) {
                    markers.push(RelativeMarker {
                        node,
                        anchor: Anchor::before(entity),
                    });
                }
                if !markers.is_empty() {
                    return markers;
                }
            }
            drop(dom);
            current = self.read(&id, Entity::logical_parent_id).flatten();
        }
        Vec::new()
    }

    fn session_entity(&self, token: DragToken) -> Option<String> {
        let drag = self.drag.borrow();
        drag.as_ref()
            .filter(|s| s.token == token)
            .map(|s| s.entity_id.clone())
    }

    fn family_of(&self, id: &str) -> Option<TreeFamily> {
        self.read(id, |e| e.kind().family()).flatten()
    }

    fn clear_cues(&self) {
        let cues = match self.drag.borrow_mut().as_mut() {
            Some(session) => std::mem::take(&mut session.cues),
            None => return,
        };
        let mut dom = self.dom.borrow_mut();
        for (node, class) in cues {
            dom.remove_class(&node, class);
        }
    }
}

/// Entity that receives the subject of `mutation`
fn target_parent(mutation: &Mutation) -> Option<String> {
    match mutation {
        Mutation::AppendChild { parent_id, .. }
        | Mutation::InsertRelative { parent_id, .. }
        | Mutation::CloneComponent { parent_id, .. }
        | Mutation::CloneNode { parent_id, .. }
        | Mutation::AppendWidget { parent_id, .. } => Some(parent_id.clone()),
        Mutation::MoveToFolder { folder_id, .. } => folder_id.clone(),
        Mutation::MoveToContainer { container_id, .. } => container_id.clone(),
        Mutation::AddMember { group_id, .. } => Some(group_id.clone()),
        Mutation::AddFavorite { .. } => None,
    }
}
