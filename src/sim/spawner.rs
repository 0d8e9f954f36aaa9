//! Per-segment obstacle and pickup spawning
//!
//! When a segment activates, every pattern row rolls against its density-scaled
//! chance and, on success, rents one pooled instance per lane in its mask. When
//! the segment deactivates, everything it spawned goes back to the pool it came
//! from.

use std::collections::HashMap;

use glam::Vec3;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg32;
use serde::{Deserialize, Serialize};

use super::lane::{Lane, ObstacleLaneMask, PickupLaneMask};
use super::pool::{Handle, Pool, Poolable, TemplateId};
use super::track::{AliveSegment, SegmentListener, SpawnedSegment};

/// Pickups float this far above their lane anchor (meters)
const PICKUP_LIFT: f32 = 0.5;

/// How an obstacle must be passed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ObstacleType {
    /// Jump over it
    Low,
    /// Slide under it
    High,
    /// Change lanes
    #[default]
    FullBlock,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum PickupType {
    /// Energy snack
    #[default]
    Treat,
    /// Slows and drains energy
    BadFood,
    /// Premium currency
    Gem,
    /// Speed boost
    Zoomies,
}

/// One obstacle pattern row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleRow {
    /// Longitudinal offset from the lane anchor (meters)
    pub offset: f32,
    pub lanes: ObstacleLaneMask,
    /// Catalog id, matched case-insensitively
    pub obstacle_id: String,
    /// Base spawn probability before density scaling
    pub chance: f32,
}

impl Default for ObstacleRow {
    fn default() -> Self {
        Self {
            offset: 8.0,
            lanes: ObstacleLaneMask::MIDDLE,
            obstacle_id: "RockFull".to_string(),
            chance: 1.0,
        }
    }
}

/// One pickup pattern row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupRow {
    pub offset: f32,
    pub lanes: PickupLaneMask,
    pub pickup_type: PickupType,
    pub amount: u32,
    pub chance: f32,
}

impl Default for PickupRow {
    fn default() -> Self {
        Self {
            offset: 5.0,
            lanes: PickupLaneMask::MIDDLE,
            pickup_type: PickupType::Treat,
            amount: 1,
            chance: 1.0,
        }
    }
}

/// Base rows plus optional interchangeable variants (content-pack patterns)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatternSet<R> {
    pub rows: Vec<R>,
    /// When non-empty, one variant is chosen per activation instead of `rows`
    pub variants: Vec<Vec<R>>,
}

impl<R> Default for PatternSet<R> {
    fn default() -> Self {
        Self {
            rows: Vec::new(),
            variants: Vec::new(),
        }
    }
}

impl<R> PatternSet<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self {
            rows,
            variants: Vec::new(),
        }
    }

    /// Rows active for one segment activation
    pub fn choose(&self, rng: &mut impl Rng) -> &[R] {
        if self.variants.is_empty() {
            return &self.rows;
        }
        let index = rng.random_range(0..self.variants.len());
        &self.variants[index]
    }

    /// Every row across base and variants
    pub fn all_rows(&self) -> impl Iterator<Item = &R> {
        self.rows.iter().chain(self.variants.iter().flatten())
    }
}

/// Effective spawn probability of a row at the current density
#[inline]
pub fn spawn_probability(chance: f32, density: f32) -> f32 {
    (chance * density).clamp(0.0, 1.0)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ObstacleTemplate {
    pub id: String,
    pub obstacle_type: ObstacleType,
    /// Non-fatal obstacles never reach the hazard resolver
    pub fatal: bool,
}

impl Default for ObstacleTemplate {
    fn default() -> Self {
        Self {
            id: "RockFull".to_string(),
            obstacle_type: ObstacleType::FullBlock,
            fatal: true,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PickupTemplate {
    pub pickup_type: PickupType,
    /// Seconds a collected pickup stays spawned before returning to the pool
    pub linger_seconds: Option<f32>,
}

/// Obstacle and pickup catalogs; list position is the template id
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ContentCatalog {
    pub obstacles: Vec<ObstacleTemplate>,
    pub pickups: Vec<PickupTemplate>,
}

impl Default for ContentCatalog {
    fn default() -> Self {
        let obstacle = |id: &str, obstacle_type| ObstacleTemplate {
            id: id.to_string(),
            obstacle_type,
            fatal: true,
        };
        let pickup = |pickup_type| PickupTemplate {
            pickup_type,
            linger_seconds: None,
        };

        Self {
            obstacles: vec![
                obstacle("RockFull", ObstacleType::FullBlock),
                obstacle("BranchLow", ObstacleType::Low),
                obstacle("FenceHigh", ObstacleType::High),
            ],
            pickups: vec![
                pickup(PickupType::Treat),
                pickup(PickupType::BadFood),
                pickup(PickupType::Gem),
                pickup(PickupType::Zoomies),
            ],
        }
    }
}

impl ContentCatalog {
    pub fn obstacle_id(&self, id: &str) -> Option<TemplateId> {
        self.obstacles
            .iter()
            .position(|o| o.id.eq_ignore_ascii_case(id))
            .map(|i| TemplateId(i as u16))
    }

    pub fn pickup_id(&self, pickup_type: PickupType) -> Option<TemplateId> {
        self.pickups
            .iter()
            .position(|p| p.pickup_type == pickup_type)
            .map(|i| TemplateId(i as u16))
    }
}

/// Spawned obstacle instance
#[derive(Debug, Clone)]
pub struct Obstacle {
    pub template: TemplateId,
    pub segment: Handle,
    pub obstacle_type: ObstacleType,
    pub fatal: bool,
    pub lane: Lane,
    pub position: Vec3,
    /// Distance along the track at which it sits
    pub track_distance: f32,
    /// Already produced a contact this spawn
    pub hit: bool,
}

impl Obstacle {
    /// Fresh instance for a pool miss; spawn fields are filled in after renting
    fn blank(template: TemplateId, segment: Handle) -> Self {
        Self {
            template,
            segment,
            obstacle_type: ObstacleType::default(),
            fatal: false,
            lane: Lane::default(),
            position: Vec3::ZERO,
            track_distance: 0.0,
            hit: false,
        }
    }
}

impl Poolable for Obstacle {
    fn on_rented(&mut self) {
        self.hit = false;
    }
}

/// Spawned pickup instance
#[derive(Debug, Clone)]
pub struct Pickup {
    pub template: TemplateId,
    pub segment: Handle,
    pub pickup_type: PickupType,
    pub amount: u32,
    pub lane: Lane,
    pub position: Vec3,
    pub track_distance: f32,
    pub collected: bool,
    /// Seconds until a collected pickup returns to its pool
    pub return_countdown: Option<f32>,
}

impl Pickup {
    fn blank(template: TemplateId, segment: Handle) -> Self {
        Self {
            template,
            segment,
            pickup_type: PickupType::default(),
            amount: 1,
            lane: Lane::default(),
            position: Vec3::ZERO,
            track_distance: 0.0,
            collected: false,
            return_countdown: None,
        }
    }
}

impl Poolable for Pickup {
    fn on_rented(&mut self) {
        self.collected = false;
        self.return_countdown = None;
    }

    fn on_returned(&mut self) {
        self.return_countdown = None;
    }
}

/// A collected pickup, reported to the host
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PickupCollected {
    pub pickup_type: PickupType,
    pub amount: u32,
}

#[derive(Debug, Default)]
struct SegmentContents {
    obstacles: Vec<Handle>,
    pickups: Vec<Handle>,
}

pub struct SegmentSpawners {
    catalog: ContentCatalog,
    obstacles: Pool<Obstacle>,
    pickups: Pool<Pickup>,
    contents: HashMap<Handle, SegmentContents>,
    rng: Pcg32,
    density: f32,
}

impl SegmentSpawners {
    pub fn new(catalog: ContentCatalog, seed: u64) -> Self {
        Self {
            catalog,
            obstacles: Pool::new(),
            pickups: Pool::new(),
            contents: HashMap::new(),
            rng: Pcg32::seed_from_u64(seed),
            density: 1.0,
        }
    }

    pub fn reseed(&mut self, seed: u64) {
        self.rng = Pcg32::seed_from_u64(seed);
    }

    /// Density multiplier applied to segments activated from now on
    pub fn set_density(&mut self, density: f32) {
        self.density = density.max(0.0);
    }

    pub fn density(&self) -> f32 {
        self.density
    }

    pub fn catalog(&self) -> &ContentCatalog {
        &self.catalog
    }

    /// Advance collected-pickup countdowns, recycling the ones that expire
    pub fn tick(&mut self, dt: f32) {
        let lingering: Vec<Handle> = self
            .pickups
            .iter_active()
            .filter(|(_, p)| p.return_countdown.is_some())
            .map(|(h, _)| h)
            .collect();

        for handle in lingering {
            let expired = match self
                .pickups
                .get_mut(handle)
                .and_then(|p| p.return_countdown.as_mut())
            {
                Some(remaining) => {
                    *remaining -= dt;
                    *remaining <= 0.0
                }
                None => false,
            };
            if expired {
                self.release_pickup(handle);
            }
        }
    }

    /// Mark an obstacle as hit; returns false if it already produced a contact
    pub fn mark_obstacle_hit(&mut self, handle: Handle) -> bool {
        match self.obstacles.get_mut(handle) {
            Some(obstacle) if !obstacle.hit => {
                obstacle.hit = true;
                true
            }
            _ => false,
        }
    }

    /// Collect a pickup once. Lingering templates keep the instance around
    /// for their countdown; everything else goes straight back to the pool.
    pub fn collect_pickup(&mut self, handle: Handle) -> Option<PickupCollected> {
        let pickup = self.pickups.get_mut(handle)?;
        if pickup.collected {
            return None;
        }
        pickup.collected = true;

        let collected = PickupCollected {
            pickup_type: pickup.pickup_type,
            amount: pickup.amount,
        };

        let linger = self
            .catalog
            .pickups
            .get(pickup.template.index())
            .and_then(|t| t.linger_seconds)
            .filter(|&s| s > 0.0);

        match linger {
            Some(seconds) => pickup.return_countdown = Some(seconds),
            None => self.release_pickup(handle),
        }

        Some(collected)
    }

    /// Uncollected pickups in `lane` within [from, to] meters
    pub fn pickups_in_lane(&self, lane: Lane, from: f32, to: f32) -> Vec<Handle> {
        self.pickups
            .iter_active()
            .filter(|(_, p)| !p.collected && p.lane == lane)
            .filter(|(_, p)| p.track_distance >= from && p.track_distance <= to)
            .map(|(h, _)| h)
            .collect()
    }

    /// Obstacles in `lane` within [from, to] meters that have not been hit yet
    pub fn obstacles_in_lane(&self, lane: Lane, from: f32, to: f32) -> Vec<Handle> {
        self.obstacles
            .iter_active()
            .filter(|(_, o)| !o.hit && o.lane == lane)
            .filter(|(_, o)| o.track_distance >= from && o.track_distance <= to)
            .map(|(h, _)| h)
            .collect()
    }

    pub fn obstacle(&self, handle: Handle) -> Option<&Obstacle> {
        self.obstacles.get(handle)
    }

    pub fn pickup(&self, handle: Handle) -> Option<&Pickup> {
        self.pickups.get(handle)
    }

    pub fn obstacles(&self) -> impl Iterator<Item = (Handle, &Obstacle)> {
        self.obstacles.iter_active()
    }

    pub fn pickups(&self) -> impl Iterator<Item = (Handle, &Pickup)> {
        self.pickups.iter_active()
    }

    pub fn obstacle_pool(&self) -> &Pool<Obstacle> {
        &self.obstacles
    }

    pub fn pickup_pool(&self) -> &Pool<Pickup> {
        &self.pickups
    }

    fn roll(&mut self, chance: f32) -> bool {
        let p = spawn_probability(chance, self.density);
        if p >= 1.0 {
            return true;
        }
        p > 0.0 && self.rng.random::<f32>() <= p
    }

    fn spawn_obstacles(&mut self, segment: &SpawnedSegment<'_>, contents: &mut SegmentContents) {
        let rows = segment.template.obstacle_patterns.choose(&mut self.rng);

        for row in rows {
            if !self.roll(row.chance) {
                continue;
            }

            let template_id = self.catalog.obstacle_id(&row.obstacle_id);
            debug_assert!(template_id.is_some(), "unregistered obstacle id `{}`", row.obstacle_id);
            let Some(template_id) = template_id else {
                continue;
            };
            let template = self.catalog.obstacles[template_id.index()].clone();

            for lane in row.lanes.lanes() {
                let anchor = segment.template.lane_anchors[lane.index() as usize];
                let local = anchor + Vec3::Z * row.offset;
                let handle = self
                    .obstacles
                    .rent(template_id, || Obstacle::blank(template_id, segment.alive.handle));

                // `hit` was reset by `on_rented`
                if let Some(obstacle) = self.obstacles.get_mut(handle) {
                    obstacle.segment = segment.alive.handle;
                    obstacle.obstacle_type = template.obstacle_type;
                    obstacle.fatal = template.fatal;
                    obstacle.lane = lane;
                    obstacle.position = segment.pose.transform_point(local);
                    obstacle.track_distance =
                        segment.alive.start_distance + segment.template.distance_along(local);
                }
                contents.obstacles.push(handle);
            }
        }
    }

    fn spawn_pickups(&mut self, segment: &SpawnedSegment<'_>, contents: &mut SegmentContents) {
        let rows = segment.template.pickup_patterns.choose(&mut self.rng);

        for row in rows {
            if !self.roll(row.chance) {
                continue;
            }

            let template_id = self.catalog.pickup_id(row.pickup_type);
            debug_assert!(template_id.is_some(), "unregistered pickup type {:?}", row.pickup_type);
            let Some(template_id) = template_id else {
                continue;
            };

            for lane in row.lanes.lanes() {
                let anchor = segment.template.lane_anchors[lane.index() as usize];
                let local = anchor + Vec3::Z * row.offset;
                let handle = self
                    .pickups
                    .rent(template_id, || Pickup::blank(template_id, segment.alive.handle));

                // `collected` and the countdown were reset by `on_rented`
                if let Some(pickup) = self.pickups.get_mut(handle) {
                    pickup.segment = segment.alive.handle;
                    pickup.pickup_type = row.pickup_type;
                    pickup.amount = row.amount.max(1);
                    pickup.lane = lane;
                    pickup.position = segment.pose.transform_point(local + Vec3::Y * PICKUP_LIFT);
                    pickup.track_distance =
                        segment.alive.start_distance + segment.template.distance_along(local);
                }
                contents.pickups.push(handle);
            }
        }
    }

    fn release_pickup(&mut self, handle: Handle) {
        let Some(pickup) = self.pickups.get(handle) else {
            return;
        };
        let (template, segment) = (pickup.template, pickup.segment);

        if let Some(contents) = self.contents.get_mut(&segment) {
            contents.pickups.retain(|&h| h != handle);
        }
        self.pickups.give_back(template, handle);
    }
}

impl SegmentListener for SegmentSpawners {
    fn on_segment_activated(&mut self, segment: &SpawnedSegment<'_>) {
        let mut contents = SegmentContents::default();
        self.spawn_obstacles(segment, &mut contents);
        self.spawn_pickups(segment, &mut contents);

        let previous = self.contents.insert(segment.alive.handle, contents);
        debug_assert!(previous.is_none(), "segment {:?} activated twice", segment.alive.handle);
    }

    fn on_segment_deactivated(&mut self, segment: &AliveSegment) {
        let Some(contents) = self.contents.remove(&segment.handle) else {
            return;
        };

        for handle in contents.obstacles {
            if let Some(template) = self.obstacles.get(handle).map(|o| o.template) {
                self.obstacles.give_back(template, handle);
            }
        }
        // Lingering pickups are cancelled here and recycled with the rest
        for handle in contents.pickups {
            if let Some(template) = self.pickups.get(handle).map(|p| p.template) {
                self.pickups.give_back(template, handle);
            }
        }
    }
}
