use crate::topology::RankContext;

/// A half-open interval `[lo, hi)`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Interval {
    pub lo: f64,
    pub hi: f64,
}

impl Interval {
    pub const fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    pub fn width(&self) -> f64 {
        self.hi - self.lo
    }

    pub fn contains(&self, v: f64) -> bool {
        self.lo <= v && v < self.hi
    }
}

/// The rectangle searched by the whole group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Domain {
    pub x: Interval,
    pub y: Interval,
}

impl Domain {
    /// `[0, 1) x [0, 1)`.
    pub const UNIT: Domain = Domain {
        x: Interval::new(0.0, 1.0),
        y: Interval::new(0.0, 1.0),
    };
}

impl Default for Domain {
    fn default() -> Self {
        Self::UNIT
    }
}

/// The part of the domain owned by one rank.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Strip {
    pub x: Interval,
    pub y: Interval,
}

/// Splits `domain` along x into `ctx.size()` equal strips and returns the one of `ctx.rank()`.
///
/// The last strip ends exactly at the domain's upper x bound, so the strips
/// cover the whole domain even when `dx * size` rounds short of it.
pub fn strip_of(ctx: RankContext, domain: Domain) -> Strip {
    let (rank, size) = (ctx.rank(), ctx.size());
    let dx = domain.x.width() / size as f64;

    let lo = domain.x.lo + dx * rank as f64;
    let hi = if rank + 1 == size {
        domain.x.hi
    } else {
        domain.x.lo + dx * (rank + 1) as f64
    };

    Strip {
        x: Interval::new(lo, hi),
        y: domain.y,
    }
}
