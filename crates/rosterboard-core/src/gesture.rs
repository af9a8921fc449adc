//! Pointer-driven container move and resize.

use crate::model::ZoneId;
use crate::sizing::{self, SectionVisibility};
use crate::store::{BoardStore, ContainerChanges};
use kurbo::{Point, Rect, Vec2};

/// Identifier the platform assigns to a pointer (mouse, pen, touch).
pub type PointerId = u64;

/// Resize handle position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResizeDirection {
    N,
    NE,
    E,
    SE,
    S,
    SW,
    W,
    NW,
}

impl ResizeDirection {
    pub const ALL: [ResizeDirection; 8] = [
        ResizeDirection::N,
        ResizeDirection::NE,
        ResizeDirection::E,
        ResizeDirection::SE,
        ResizeDirection::S,
        ResizeDirection::SW,
        ResizeDirection::W,
        ResizeDirection::NW,
    ];

    fn north(self) -> bool {
        matches!(self, ResizeDirection::N | ResizeDirection::NE | ResizeDirection::NW)
    }

    fn south(self) -> bool {
        matches!(self, ResizeDirection::S | ResizeDirection::SE | ResizeDirection::SW)
    }

    fn east(self) -> bool {
        matches!(self, ResizeDirection::E | ResizeDirection::NE | ResizeDirection::SE)
    }

    fn west(self) -> bool {
        matches!(self, ResizeDirection::W | ResizeDirection::NW | ResizeDirection::SW)
    }
}

/// What a gesture does to its container.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GestureKind {
    Move,
    Resize(ResizeDirection),
}

/// A captured pointer manipulating one container.
#[derive(Debug, Clone, PartialEq)]
pub struct ContainerGesture {
    pub container_id: ZoneId,
    pub pointer_id: PointerId,
    pub kind: GestureKind,
    start_pointer: Point,
    origin: Rect,
    zoom: f64,
}

impl ContainerGesture {
    /// Capture `pointer_id` on a container and bring it to the front.
    /// `zoom` is the viewport scale; non-positive values are treated as 1.
    pub fn begin(
        store: &mut BoardStore,
        container_id: &str,
        pointer_id: PointerId,
        kind: GestureKind,
        pointer: Point,
        zoom: f64,
    ) -> Option<Self> {
        let origin = store.container(container_id)?.rect();
        store.bring_to_front(container_id);
        log::debug!("gesture/begin container={container_id} pointer={pointer_id} kind={kind:?}");
        Some(Self {
            container_id: container_id.to_string(),
            pointer_id,
            kind,
            start_pointer: pointer,
            origin,
            zoom: if zoom > 0.0 { zoom } else { 1.0 },
        })
    }

    /// Pointer delta since capture, in board units.
    fn board_delta(&self, pointer: Point) -> Vec2 {
        (pointer - self.start_pointer) / self.zoom
    }

    /// Apply a pointer move. Moves from other pointers are ignored.
    pub fn update(&self, store: &mut BoardStore, pointer_id: PointerId, pointer: Point) -> bool {
        if pointer_id != self.pointer_id {
            return false;
        }
        let delta = self.board_delta(pointer);
        match self.kind {
            GestureKind::Move => store.move_container(
                &self.container_id,
                self.origin.x0 + delta.x,
                self.origin.y0 + delta.y,
            ),
            GestureKind::Resize(direction) => match self.resized_rect(store, direction, delta) {
                Some(rect) => store.update_container(
                    &self.container_id,
                    ContainerChanges {
                        x: Some(rect.x0),
                        y: Some(rect.y0),
                        width: Some(rect.width()),
                        height: Some(rect.height()),
                        ..Default::default()
                    },
                ),
                None => false,
            },
        }
    }

    /// Target rectangle for a resize: width clamped first, height against
    /// the clamped width, west/north edges anchored on the opposite side.
    fn resized_rect(
        &self,
        store: &BoardStore,
        direction: ResizeDirection,
        delta: Vec2,
    ) -> Option<Rect> {
        let container = store.container(&self.container_id)?;
        let origin = self.origin;
        let mut raw_width = origin.width();
        let mut raw_height = origin.height();
        if direction.east() {
            raw_width = origin.width() + delta.x;
        }
        if direction.south() {
            raw_height = origin.height() + delta.y;
        }
        if direction.west() {
            raw_width = origin.width() - delta.x;
        }
        if direction.north() {
            raw_height = origin.height() - delta.y;
        }

        let visibility = SectionVisibility {
            show_staff_section: container.accepts_staff,
            show_newcomer_section: container.accepts_newcomers,
        };
        let tiles = store.tiles_in_zone(&self.container_id);
        let horizontal =
            sizing::minimum_size(raw_width, tiles.iter().copied(), visibility, store.layout());
        let width = raw_width.max(horizontal.min_width);
        let vertical =
            sizing::minimum_size(width, tiles.iter().copied(), visibility, store.layout());
        let height = raw_height.max(vertical.min_height);

        let mut x = origin.x0;
        let mut y = origin.y0;
        if direction.west() {
            x = origin.x0 + (origin.width() - width);
        }
        if direction.north() {
            y = origin.y0 + (origin.height() - height);
        }
        let (x, y) = (x.max(0.0), y.max(0.0));
        Some(Rect::new(x, y, x + width, y + height))
    }

    /// Whether a pointer-up or pointer-cancel ends this gesture.
    pub fn releases(&self, pointer_id: PointerId) -> bool {
        pointer_id == self.pointer_id
    }
}

/// Holds at most one container gesture; a new capture replaces the old.
#[derive(Debug, Clone, Default)]
pub struct GestureTracker {
    active: Option<ContainerGesture>,
}

impl GestureTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn active(&self) -> Option<&ContainerGesture> {
        self.active.as_ref()
    }

    pub fn pointer_down(
        &mut self,
        store: &mut BoardStore,
        container_id: &str,
        pointer_id: PointerId,
        kind: GestureKind,
        pointer: Point,
        zoom: f64,
    ) -> bool {
        self.active = ContainerGesture::begin(store, container_id, pointer_id, kind, pointer, zoom);
        self.active.is_some()
    }

    pub fn pointer_move(
        &mut self,
        store: &mut BoardStore,
        pointer_id: PointerId,
        pointer: Point,
    ) -> bool {
        match &self.active {
            Some(gesture) => gesture.update(store, pointer_id, pointer),
            None => false,
        }
    }

    /// Pointer up or cancel. Returns whether the active gesture ended.
    pub fn pointer_up(&mut self, pointer_id: PointerId) -> bool {
        if self.active.as_ref().is_some_and(|gesture| gesture.releases(pointer_id)) {
            log::debug!("gesture/end pointer={pointer_id}");
            self.active = None;
            return true;
        }
        false
    }
}
