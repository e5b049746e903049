//! Rank ladder and progression calculator.
//!
//! Rank is never stored on its own: it is always derived from the point total.

/// One rung of the ladder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rank {
    pub level: u32,
    /// Points needed to hold this rank. Negative only for the deserter pseudo-rank.
    pub min_points: i64,
    pub icon: &'static str,
    pub name: &'static str,
}

/// Ascending by `min_points`.
pub const RANKS: [Rank; 10] = [
    Rank { level: 1, min_points: 0, icon: "👶", name: "CIVILNÍ KONTAKT" },
    Rank { level: 2, min_points: 150, icon: "🎖️", name: "REKRUT JEDNOTKY \"TÁTA\"" },
    Rank { level: 3, min_points: 450, icon: "🔭", name: "OPERÁTOR PRŮZKUMU" },
    Rank { level: 4, min_points: 900, icon: "📦", name: "SPECIALISTA LOGISTIKY" },
    Rank { level: 5, min_points: 1500, icon: "⚙️", name: "ANALYTIK KONFIGURACÍ" },
    Rank { level: 6, min_points: 2300, icon: "🧠", name: "TAKTICKÝ PORADCE" },
    Rank { level: 7, min_points: 3300, icon: "🚁", name: "VELITEL VÝSADKOVÉHO TÝMU" },
    Rank { level: 8, min_points: 4500, icon: "🛡️", name: "STRÁŽCE SEKTORU" },
    Rank { level: 9, min_points: 6000, icon: "🎖️", name: "ELITNÍ VETERÁN" },
    Rank { level: 10, min_points: 8000, icon: "👑", name: "GENERÁL TATÍNEK" },
];

/// Shown in place of the real rank while the user is flagged for inactivity.
pub const DESERTER_RANK: Rank = Rank { level: 0, min_points: -1, icon: "🌑", name: "DEZERTÉR" };

/// XP lost when a restored mission is missed a second time.
pub const RESTORE_FAILURE_PENALTY: u32 = 30;

/// Highest rank whose threshold the point total reaches.
pub fn rank_of(points: u32) -> Rank {
    let points = i64::from(points);
    RANKS
        .iter()
        .rev()
        .find(|r| r.min_points <= points)
        .copied()
        .unwrap_or(RANKS[0])
}

/// The rank directly above `rank`, if any.
pub fn next_rank(rank: Rank) -> Option<Rank> {
    RANKS.iter().find(|r| r.level == rank.level + 1).copied()
}

/// Rank standing computed from a point total.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Progression {
    /// Real rank from the points, used for all progress math.
    pub rank: Rank,
    pub next: Option<Rank>,
    /// 0..=100 toward `next`; 100 once the ladder is exhausted.
    pub percent: f64,
    /// What the user is shown. Equals `rank` unless the deserter override is on.
    pub displayed: Rank,
}

impl Progression {
    pub fn is_deserter(&self) -> bool {
        self.displayed == DESERTER_RANK
    }
}

pub fn progression(points: u32, deserter: bool) -> Progression {
    let rank = rank_of(points);
    let next = next_rank(rank);
    let percent = match next {
        None => 100.0,
        Some(n) => {
            let span = (n.min_points - rank.min_points) as f64;
            let done = (i64::from(points) - rank.min_points) as f64;
            (done / span * 100.0).clamp(0.0, 100.0)
        }
    };
    Progression {
        rank,
        next,
        percent,
        displayed: if deserter { DESERTER_RANK } else { rank },
    }
}

/// Apply an XP delta, flooring the total at zero.
pub fn apply_xp(points: u32, delta: i64) -> u32 {
    let total = i64::from(points) + delta;
    total.clamp(0, i64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rank_threshold_never_exceeds_points() {
        for p in (0..10_000).step_by(7) {
            let r = rank_of(p);
            assert!(r.min_points <= i64::from(p));
            if let Some(n) = next_rank(r) {
                assert!(n.min_points > i64::from(p), "points {p} should have reached {}", n.name);
            }
        }
    }

    #[test]
    fn boundaries() {
        assert_eq!(rank_of(0).level, 1);
        assert_eq!(rank_of(149).level, 1);
        assert_eq!(rank_of(150).level, 2);
        assert_eq!(rank_of(8000).level, 10);
        assert_eq!(rank_of(u32::MAX).level, 10);
    }

    #[test]
    fn progress_is_linear_between_ranks() {
        let p = progression(300, false);
        assert_eq!(p.rank.level, 2);
        assert_eq!(p.next.map(|r| r.level), Some(3));
        assert!((p.percent - 50.0).abs() < 1e-9);
    }

    #[test]
    fn top_rank_reports_full_progress() {
        let p = progression(9000, false);
        assert!(p.next.is_none());
        assert_eq!(p.percent, 100.0);
    }

    #[test]
    fn deserter_overrides_display_only() {
        let p = progression(460, true);
        assert!(p.is_deserter());
        assert_eq!(p.displayed, DESERTER_RANK);
        assert_eq!(p.rank.level, 3);
        assert!(p.percent > 0.0 && p.percent < 100.0);
    }

    #[test]
    fn xp_floor_is_zero() {
        assert_eq!(apply_xp(20, -30), 0);
        assert_eq!(apply_xp(20, 30), 50);
    }
}
