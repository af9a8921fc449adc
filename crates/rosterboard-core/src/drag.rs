//! Tile drag-and-drop.
//!
//! The pointer collaborator reports drag lifecycle events; [`DragController`]
//! records them in the [`UiSession`] and applies the drop to the
//! [`BoardStore`]. Hit-testing of overlapping zones is resolved here by
//! priority so the topmost container always wins over a bank beneath it.

use crate::model::{BankType, ZoneId};
use crate::rules;
use crate::session::{DragSession, UiSession};
use crate::store::BoardStore;
use kurbo::{Point, Rect, Vec2};
use std::time::Duration;

/// Priority declared by every bank.
pub const BANK_DROP_PRIORITY: i64 = 1;
/// Added to a container's z-index so containers outrank banks.
pub const CONTAINER_PRIORITY_OFFSET: i64 = 100;

const SNAP_DROP_ANIMATION_MS: u64 = 200;
const RETURN_DROP_ANIMATION_MS: u64 = 250;

/// Animation played when the dragged tile is released.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DropAnimation {
    /// Tile snaps into an accepting zone.
    #[default]
    Snap,
    /// Tile flies back after an invalid drop or cancel.
    Return,
}

impl DropAnimation {
    pub fn duration(self) -> Duration {
        match self {
            DropAnimation::Snap => Duration::from_millis(SNAP_DROP_ANIMATION_MS),
            DropAnimation::Return => Duration::from_millis(RETURN_DROP_ANIMATION_MS),
        }
    }
}

/// What a drop did to the board.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DropOutcome {
    /// Moved into the accepting target zone.
    Moved { to: ZoneId },
    /// Dropped back onto the zone it came from.
    SameZone,
    /// Invalid drop; sent to the tile type's default bank.
    ReturnedToBank { bank: ZoneId },
    /// Invalid drop while already in the default bank (or no bank exists).
    Unchanged,
    /// No drag was in progress, or the dragged tile no longer exists.
    Ignored,
}

/// Lifecycle events reported by the pointer collaborator.
#[derive(Debug, Clone, PartialEq)]
pub enum DragEvent {
    Start { tile_id: String },
    Move { delta: Vec2 },
    Over { target: Option<ZoneId> },
    End { target: Option<ZoneId> },
    Cancel,
}

/// Drives the single active drag session.
#[derive(Debug, Clone, Default)]
pub struct DragController {
    drop_animation: DropAnimation,
}

impl DragController {
    pub fn new() -> Self {
        Self::default()
    }

    /// Animation to use for the most recent drop or cancel.
    pub fn drop_animation(&self) -> DropAnimation {
        self.drop_animation
    }

    /// Dispatch a collaborator event.
    pub fn handle(
        &mut self,
        store: &mut BoardStore,
        session: &mut UiSession,
        event: DragEvent,
    ) -> Option<DropOutcome> {
        match event {
            DragEvent::Start { tile_id } => {
                self.start(store, session, &tile_id);
                None
            }
            DragEvent::Move { delta } => {
                self.drag_move(session, delta);
                None
            }
            DragEvent::Over { target } => {
                self.hover(session, target.as_deref());
                None
            }
            DragEvent::End { target } => Some(self.end(store, session, target.as_deref())),
            DragEvent::Cancel => {
                self.cancel(session);
                None
            }
        }
    }

    /// Begin dragging a tile. Refused for unknown tiles and while another
    /// drag is active.
    pub fn start(&mut self, store: &BoardStore, session: &mut UiSession, tile_id: &str) -> bool {
        if let Some(active) = &session.drag {
            log::warn!(
                "dnd/drag-start ignored tile={tile_id}: tile {} already dragging",
                active.tile_id
            );
            return false;
        }
        let Some(tile) = store.tile(tile_id) else {
            log::error!("dnd/drag-start-missing-tile tile={tile_id}");
            return false;
        };

        log::debug!("dnd/drag-start tile={tile_id} origin={}", tile.current_zone_id);
        self.drop_animation = DropAnimation::Snap;
        session.drag = Some(DragSession {
            tile_id: tile_id.to_string(),
            origin_zone_id: tile.current_zone_id.clone(),
            current_position: Vec2::ZERO,
            active_drop_target_id: None,
        });
        true
    }

    /// Record the pointer offset. Does not re-run hit-testing.
    pub fn drag_move(&mut self, session: &mut UiSession, delta: Vec2) {
        if let Some(drag) = session.drag.as_mut() {
            log::trace!("dnd/drag-move tile={} delta={delta:?}", drag.tile_id);
            drag.current_position = delta;
        }
    }

    /// Record the zone under the pointer. Returns whether it changed.
    pub fn hover(&mut self, session: &mut UiSession, target: Option<&str>) -> bool {
        let Some(drag) = session.drag.as_mut() else {
            return false;
        };
        if drag.active_drop_target_id.as_deref() == target {
            return false;
        }
        log::debug!("dnd/drag-over tile={} target={target:?}", drag.tile_id);
        drag.active_drop_target_id = target.map(str::to_string);
        true
    }

    /// Finish the drag over `target` (or over nothing).
    pub fn end(
        &mut self,
        store: &mut BoardStore,
        session: &mut UiSession,
        target: Option<&str>,
    ) -> DropOutcome {
        let Some(drag) = session.drag.take() else {
            log::debug!("dnd/drag-end without active drag");
            return DropOutcome::Ignored;
        };
        let Some(tile) = store.tile(&drag.tile_id) else {
            log::error!("dnd/drag-end-missing-tile tile={}", drag.tile_id);
            return DropOutcome::Ignored;
        };
        let tile_id = tile.id.clone();
        let tile_type = tile.tile_type;
        let current_zone = tile.current_zone_id.clone();

        let valid_target =
            target.filter(|zone| rules::is_valid_zone(tile_type, zone, store.state()));

        if let Some(zone) = valid_target {
            self.drop_animation = DropAnimation::Snap;
            if zone == current_zone {
                log::debug!("dnd/drop-noop-same-zone tile={tile_id} zone={zone}");
                DropOutcome::SameZone
            } else {
                store.move_tile(&tile_id, zone);
                log::debug!("dnd/drop-applied tile={tile_id} zone={zone}");
                DropOutcome::Moved {
                    to: zone.to_string(),
                }
            }
        } else {
            self.drop_animation = DropAnimation::Return;
            match store.state().default_bank_id(tile_type).cloned() {
                Some(bank) if bank != current_zone => {
                    store.move_tile(&tile_id, &bank);
                    log::debug!(
                        "dnd/drop-return-to-default-bank tile={tile_id} bank={bank} previous={current_zone}"
                    );
                    DropOutcome::ReturnedToBank { bank }
                }
                bank => {
                    log::debug!("dnd/drop-no-valid-target-no-move tile={tile_id} bank={bank:?}");
                    DropOutcome::Unchanged
                }
            }
        }
    }

    /// Abandon the drag; the tile never moves.
    pub fn cancel(&mut self, session: &mut UiSession) {
        log::debug!("dnd/drag-cancel");
        self.drop_animation = DropAnimation::Return;
        session.drag = None;
    }
}

/// A zone's hit area as laid out by the collaborator.
#[derive(Debug, Clone, PartialEq)]
pub struct DropTarget {
    pub zone_id: ZoneId,
    pub rect: Rect,
    pub priority: i64,
}

/// Pick the target under `pointer` with the highest priority. Equal
/// priorities resolve to the smallest zone id.
pub fn resolve_drop_target(pointer: Point, targets: &[DropTarget]) -> Option<&DropTarget> {
    let hits: Vec<&DropTarget> = targets
        .iter()
        .filter(|target| contains_inclusive(target.rect, pointer))
        .collect();
    if hits.len() > 1 {
        log::debug!(
            "collision/multiple-targets pointer={pointer:?} candidates={:?}",
            hits.iter().map(|t| t.zone_id.as_str()).collect::<Vec<_>>()
        );
    }
    hits.into_iter().min_by(|a, b| {
        b.priority
            .cmp(&a.priority)
            .then_with(|| a.zone_id.cmp(&b.zone_id))
    })
}

/// Edges count as inside, matching pointer hit-testing on DOM rects.
fn contains_inclusive(rect: Rect, point: Point) -> bool {
    point.x >= rect.x0 && point.x <= rect.x1 && point.y >= rect.y0 && point.y <= rect.y1
}

/// Build drop targets: containers from their stored geometry, banks from
/// the rectangles the collaborator laid them out at.
pub fn drop_targets(store: &BoardStore, bank_rects: &[(BankType, Rect)]) -> Vec<DropTarget> {
    let containers = store.containers_by_z().into_iter().map(|container| DropTarget {
        zone_id: container.id.clone(),
        rect: container.rect(),
        priority: container.z_index + CONTAINER_PRIORITY_OFFSET,
    });
    let banks = bank_rects.iter().filter_map(|&(bank_type, rect)| {
        store.bank_by_type(bank_type).map(|bank| DropTarget {
            zone_id: bank.id.clone(),
            rect,
            priority: BANK_DROP_PRIORITY,
        })
    });
    containers.chain(banks).collect()
}
