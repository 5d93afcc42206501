use crate::math::Vec2;

/// Axis-aligned bounding box in projected map units.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Aabb2 {
    pub min: [f64; 2],
    pub max: [f64; 2],
}

impl Aabb2 {
    pub fn new(min: [f64; 2], max: [f64; 2]) -> Self {
        Aabb2 { min, max }
    }

    /// Bounds of a point set; `None` when the set is empty.
    pub fn from_points<'a>(points: impl IntoIterator<Item = &'a Vec2>) -> Option<Self> {
        let mut it = points.into_iter();
        let first = it.next()?;
        let mut b = Aabb2::new([first.x, first.y], [first.x, first.y]);
        for p in it {
            b.include(*p);
        }
        Some(b)
    }

    pub fn include(&mut self, p: Vec2) {
        self.min[0] = self.min[0].min(p.x);
        self.min[1] = self.min[1].min(p.y);
        self.max[0] = self.max[0].max(p.x);
        self.max[1] = self.max[1].max(p.y);
    }

    pub fn union(&self, other: &Aabb2) -> Aabb2 {
        Aabb2::new(
            [self.min[0].min(other.min[0]), self.min[1].min(other.min[1])],
            [self.max[0].max(other.max[0]), self.max[1].max(other.max[1])],
        )
    }

    pub fn expanded(&self, margin: f64) -> Aabb2 {
        Aabb2::new(
            [self.min[0] - margin, self.min[1] - margin],
            [self.max[0] + margin, self.max[1] + margin],
        )
    }

    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.min[0] && p.x <= self.max[0] && p.y >= self.min[1] && p.y <= self.max[1]
    }

    pub fn intersects(&self, other: &Aabb2) -> bool {
        !(other.max[0] < self.min[0]
            || other.min[0] > self.max[0]
            || other.max[1] < self.min[1]
            || other.min[1] > self.max[1])
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.min[0] + self.max[0]) * 0.5,
            (self.min[1] + self.max[1]) * 0.5,
        )
    }

    pub fn width(&self) -> f64 {
        self.max[0] - self.min[0]
    }

    pub fn height(&self) -> f64 {
        self.max[1] - self.min[1]
    }
}
