//! Static board layout: sectors on a square loop and the train routes.

use std::ops::{Add, Mul, Sub};

use serde::{Deserialize, Serialize};

pub type SectorId = u32;

const SECTOR_COUNT: u32 = 40;
const SIDE: u32 = 10;
const RAIL_OFFSET: f32 = 0.8;
const SLOT_SPREAD: f32 = 0.22;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Vec3 {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Vec3 {
    pub const ZERO: Vec3 = Vec3 { x: 0.0, y: 0.0, z: 0.0 };
    pub const UP: Vec3 = Vec3 { x: 0.0, y: 1.0, z: 0.0 };

    pub const fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    pub fn lerp(self, to: Vec3, t: f32) -> Vec3 {
        self + (to - self) * t
    }

    pub fn distance(self, other: Vec3) -> f32 {
        let d = other - self;
        (d.x * d.x + d.y * d.y + d.z * d.z).sqrt()
    }
}

impl Add for Vec3 {
    type Output = Vec3;
    fn add(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl Sub for Vec3 {
    type Output = Vec3;
    fn sub(self, o: Vec3) -> Vec3 {
        Vec3::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl Mul<f32> for Vec3 {
    type Output = Vec3;
    fn mul(self, k: f32) -> Vec3 {
        Vec3::new(self.x * k, self.y * k, self.z * k)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SectorKind {
    Property,
    Railroad,
    Prison,
    Bonus,
    Parking,
    StartCorner,
}

/// Length class of the game rolled when a player lands on the sector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RollType {
    Regular,
    Short,
    Long,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sector {
    pub id: SectorId,
    pub kind: SectorKind,
    pub position: Vec3,
    pub roll_type: RollType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrainRoute {
    pub from: SectorId,
    pub to: SectorId,
}

#[derive(Debug, Clone)]
pub struct Board {
    sectors: Vec<Sector>,
    routes: Vec<TrainRoute>,
}

impl Board {
    /// The 40-sector event board.
    pub fn classic() -> Self {
        let sectors = (1..=SECTOR_COUNT)
            .map(|id| Sector {
                id,
                kind: classic_kind(id),
                position: loop_position(id),
                roll_type: classic_roll_type(id),
            })
            .collect();
        let routes = vec![
            TrainRoute { from: 6, to: 16 },
            TrainRoute { from: 16, to: 26 },
            TrainRoute { from: 26, to: 36 },
            TrainRoute { from: 36, to: 6 },
        ];
        Self { sectors, routes }
    }

    pub fn len(&self) -> u32 {
        self.sectors.len() as u32
    }

    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    pub fn sector(&self, id: SectorId) -> Option<&Sector> {
        id.checked_sub(1).and_then(|i| self.sectors.get(i as usize))
    }

    pub fn sectors(&self) -> &[Sector] {
        &self.sectors
    }

    pub fn contains(&self, id: SectorId) -> bool {
        self.sector(id).is_some()
    }

    /// Next sector in board order, wrapping from the last back to 1.
    pub fn next(&self, id: SectorId) -> SectorId {
        if id >= self.len() { 1 } else { id + 1 }
    }

    /// Sectors visited when walking `steps` forward from `from`, destination last.
    pub fn walk(&self, from: SectorId, steps: u32) -> Vec<SectorId> {
        let mut path = Vec::with_capacity(steps as usize);
        let mut current = from;
        for _ in 0..steps {
            current = self.next(current);
            path.push(current);
        }
        path
    }

    /// Forward distance along the loop.
    pub fn distance(&self, from: SectorId, to: SectorId) -> u32 {
        let n = self.len();
        (to + n - from) % n
    }

    pub fn is_railroad(&self, id: SectorId) -> bool {
        self.sector(id).is_some_and(|s| s.kind == SectorKind::Railroad)
    }

    pub fn train_route(&self, from: SectorId) -> Option<TrainRoute> {
        self.routes.iter().copied().find(|r| r.from == from)
    }

    pub fn routes(&self) -> &[TrainRoute] {
        &self.routes
    }

    /// Sectors a building can be placed on.
    pub fn building_sectors(&self) -> impl Iterator<Item = &Sector> {
        self.sectors.iter().filter(|s| s.kind == SectorKind::Property)
    }

    /// Resting position of a token that occupies `slot` on a sector.
    pub fn token_position(&self, id: SectorId, slot: usize) -> Vec3 {
        let base = self.sector(id).map(|s| s.position).unwrap_or(Vec3::ZERO);
        base + slot_offset(slot)
    }

    /// Point beside the sector where the rail starts or ends.
    pub fn rail_point(&self, id: SectorId) -> Vec3 {
        let base = self.sector(id).map(|s| s.position).unwrap_or(Vec3::ZERO);
        base + outward(id) * RAIL_OFFSET
    }
}

fn classic_kind(id: SectorId) -> SectorKind {
    match id {
        1 => SectorKind::StartCorner,
        11 | 31 => SectorKind::Prison,
        21 => SectorKind::Parking,
        6 | 16 | 26 | 36 => SectorKind::Railroad,
        3 | 8 | 18 | 23 | 34 | 38 => SectorKind::Bonus,
        _ => SectorKind::Property,
    }
}

fn classic_roll_type(id: SectorId) -> RollType {
    match (id - 1) / SIDE {
        0 => RollType::Short,
        3 => RollType::Long,
        _ => RollType::Regular,
    }
}

fn loop_position(id: SectorId) -> Vec3 {
    let i = id - 1;
    let offset = (i % SIDE) as f32;
    let side = SIDE as f32;
    match i / SIDE {
        0 => Vec3::new(offset, 0.0, 0.0),
        1 => Vec3::new(side, 0.0, offset),
        2 => Vec3::new(side - offset, 0.0, side),
        _ => Vec3::new(0.0, 0.0, side - offset),
    }
}

fn outward(id: SectorId) -> Vec3 {
    match id.saturating_sub(1) / SIDE % 4 {
        0 => Vec3::new(0.0, 0.0, -1.0),
        1 => Vec3::new(1.0, 0.0, 0.0),
        2 => Vec3::new(0.0, 0.0, 1.0),
        _ => Vec3::new(-1.0, 0.0, 0.0),
    }
}

fn slot_offset(slot: usize) -> Vec3 {
    // 3x3 grid around the sector centre, centre cell last
    const GRID: [(f32, f32); 9] = [
        (-1.0, -1.0), (1.0, -1.0), (-1.0, 1.0), (1.0, 1.0),
        (0.0, -1.0), (0.0, 1.0), (-1.0, 0.0), (1.0, 0.0),
        (0.0, 0.0),
    ];
    let (dx, dz) = GRID[slot % GRID.len()];
    Vec3::new(dx * SLOT_SPREAD, 0.0, dz * SLOT_SPREAD)
}
