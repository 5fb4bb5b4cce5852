use std::collections::{BTreeMap, VecDeque};

use super::{Backend, Paint, SurfaceId};
use crate::geometry::{Point, Rect, Size};
use crate::menu::event::Event;
use crate::menu::pulldown::Owner;

#[derive(Debug, Clone, Default)]
pub struct SurfaceRecord {
    pub rect: Rect,
    pub shown: bool,
    pub destroyed: bool,
    /// Times the surface went from shown to hidden without being destroyed.
    pub hides: usize,
    /// Every `paint` batch in arrival order.
    pub paints: Vec<Vec<Paint>>,
}

#[derive(Debug)]
enum Step {
    Event(Event),
    DestroyOwner,
}

/// In-memory backend: one fixed screen, a monospace text metric and a
/// scripted event queue. Surfaces are recorded rather than drawn.
#[derive(Debug)]
pub struct HeadlessBackend {
    screen: Rect,
    pointer: Point,
    next_id: u64,
    surfaces: BTreeMap<SurfaceId, SurfaceRecord>,
    grabbed: bool,
    queue: VecDeque<Step>,
    owner: Option<Owner>,
    double_destroys: usize,
}

impl HeadlessBackend {
    pub fn new(screen: Rect) -> Self {
        Self {
            screen,
            pointer: Point::default(),
            next_id: 1,
            surfaces: BTreeMap::new(),
            grabbed: false,
            queue: VecDeque::new(),
            owner: None,
            double_destroys: 0,
        }
    }

    pub fn set_pointer(&mut self, p: Point) {
        self.pointer = p;
    }

    pub fn queue(&mut self, events: impl IntoIterator<Item = Event>) {
        self.queue.extend(events.into_iter().map(Step::Event));
    }

    /// Hold `owner` until the script reaches a `queue_destroy_owner` step.
    pub fn attach_owner(&mut self, owner: Owner) {
        self.owner = Some(owner);
    }

    pub fn queue_destroy_owner(&mut self) {
        self.queue.push_back(Step::DestroyOwner);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    pub fn surface(&self, id: SurfaceId) -> Option<&SurfaceRecord> {
        self.surfaces.get(&id)
    }

    pub fn live_surfaces(&self) -> Vec<SurfaceId> {
        self.surfaces
            .iter()
            .filter(|(_, s)| !s.destroyed)
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn created(&self) -> usize {
        self.surfaces.len()
    }

    pub fn is_grabbed(&self) -> bool {
        self.grabbed
    }

    pub fn double_destroys(&self) -> usize {
        self.double_destroys
    }

    fn record(&mut self, id: SurfaceId) -> Option<&mut SurfaceRecord> {
        match self.surfaces.get_mut(&id) {
            Some(s) if !s.destroyed => Some(s),
            _ => {
                log::warn!("headless: operation on dead surface {id:?}");
                None
            }
        }
    }
}

impl Backend for HeadlessBackend {
    fn work_area(&self, _at: Point) -> Rect {
        self.screen
    }

    fn pointer(&self) -> Point {
        self.pointer
    }

    fn text_size(&self, text: &str, font_size: u16) -> Size {
        let advance = i32::from(font_size) * 6 / 10;
        Size::new(text.chars().count() as i32 * advance, i32::from(font_size))
    }

    fn create_surface(&mut self, rect: Rect) -> SurfaceId {
        let id = SurfaceId(self.next_id);
        self.next_id += 1;
        self.surfaces.insert(
            id,
            SurfaceRecord {
                rect,
                ..Default::default()
            },
        );
        log::trace!("headless: create {id:?} at {rect:?}");
        id
    }

    fn set_geometry(&mut self, id: SurfaceId, rect: Rect) {
        if let Some(s) = self.record(id) {
            s.rect = rect;
        }
    }

    fn show(&mut self, id: SurfaceId) {
        if let Some(s) = self.record(id) {
            s.shown = true;
        }
    }

    fn hide(&mut self, id: SurfaceId) {
        if let Some(s) = self.record(id) {
            if s.shown {
                s.hides += 1;
            }
            s.shown = false;
        }
    }

    fn is_shown(&self, id: SurfaceId) -> bool {
        self.surfaces
            .get(&id)
            .is_some_and(|s| s.shown && !s.destroyed)
    }

    fn destroy(&mut self, id: SurfaceId) {
        match self.surfaces.get_mut(&id) {
            Some(s) if !s.destroyed => {
                s.destroyed = true;
                s.shown = false;
                log::trace!("headless: destroy {id:?}");
            }
            _ => self.double_destroys += 1,
        }
    }

    fn paint(&mut self, id: SurfaceId, ops: &[Paint]) {
        if let Some(s) = self.record(id) {
            s.paints.push(ops.to_vec());
        }
    }

    fn grab(&mut self, on: bool) {
        self.grabbed = on;
    }

    fn wait(&mut self) -> Option<Event> {
        loop {
            match self.queue.pop_front()? {
                Step::Event(event) => {
                    if let Some(p) = event.position() {
                        self.pointer = p;
                    }
                    return Some(event);
                }
                Step::DestroyOwner => {
                    log::debug!("headless: dropping owner");
                    self.owner = None;
                }
            }
        }
    }
}
