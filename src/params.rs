// Fixed parameters of the ratings reference standard. None of these are tunable at runtime.

/// Width of the Gaussian significance decay, in tropical years.
pub const DECAY: f64 = 2.5731;
pub const TROPICAL_YEAR: f64 = 365.246;
pub const SIGNIFICANCE_DECIMALS: i32 = 6;

/// Players below this many effective games carry no international or national rank.
pub const MIN_EFF_GAMES: f64 = 5.0;

/// Relative tolerance when a computed significance is compared with a published one.
pub const SIGNIFICANCE_RTOL: f64 = 1e-4;
/// Tolerances for comparing two published significance values (numpy `isclose` defaults).
pub const PUBLISHED_RTOL: f64 = 1e-5;
pub const PUBLISHED_ATOL: f64 = 1e-8;

/// Published ratings are offset by this amount from the Elo-style reference values.
pub const RATING_OFFSET: i32 = 800;

pub const MIN_SCORE_FRACTION: f64 = 0.35;
pub const MIN_TITLE_GAMES: u32 = 30;
pub const MIN_NORM_GAMES: u32 = 27;
pub const RATING_FLOOR: i32 = 1000 - RATING_OFFSET;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Title {
    Gm,
    Im,
    Wgm,
    Wim,
    Fm,
    Cm,
    Wfm,
    Wcm,
}

/// Rating requirements attached to a title. Only the four norm titles carry
/// adjusted, norm and average ratings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TitleFloors {
    pub min_rating: i32,
    pub adjusted_rating: Option<i32>,
    pub norm_rating: Option<i32>,
    pub average_rating: Option<i32>,
}

impl Title {
    pub const ALL: [Title; 8] = [
        Title::Gm,
        Title::Im,
        Title::Wgm,
        Title::Wim,
        Title::Fm,
        Title::Cm,
        Title::Wfm,
        Title::Wcm,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Title::Gm => "GM",
            Title::Im => "IM",
            Title::Wgm => "WGM",
            Title::Wim => "WIM",
            Title::Fm => "FM",
            Title::Cm => "CM",
            Title::Wfm => "WFM",
            Title::Wcm => "WCM",
        }
    }

    pub fn floors(self) -> TitleFloors {
        let (min, adj, norm, avg) = match self {
            Title::Gm => (2500, Some(2200), Some(2600), Some(2380)),
            Title::Im => (2400, Some(2050), Some(2450), Some(2230)),
            Title::Wgm => (2300, Some(2000), Some(2400), Some(2180)),
            Title::Wim => (2200, Some(1850), Some(2250), Some(2030)),
            Title::Fm => (2300, None, None, None),
            Title::Cm => (2200, None, None, None),
            Title::Wfm => (2100, None, None, None),
            Title::Wcm => (2000, None, None, None),
        };
        let shift = |r: i32| r - RATING_OFFSET;
        TitleFloors {
            min_rating: shift(min),
            adjusted_rating: adj.map(shift),
            norm_rating: norm.map(shift),
            average_rating: avg.map(shift),
        }
    }
}
