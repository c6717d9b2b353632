use paddock_types::SessionType;

const RACE_POINTS: [u32; 10] = [25, 18, 15, 12, 10, 8, 6, 4, 2, 1];
const SPRINT_POINTS_2021: [u32; 3] = [3, 2, 1];
const SPRINT_POINTS: [u32; 8] = [8, 7, 6, 5, 4, 3, 2, 1];

/// Seasons that awarded a bonus point for the fastest lap
const FASTEST_LAP_BONUS_SEASONS: std::ops::RangeInclusive<i32> = 2019..=2024;

fn table(season: i32, session_type: SessionType) -> &'static [u32] {
    match session_type {
        SessionType::Race => &RACE_POINTS,
        SessionType::Sprint if season == 2021 => &SPRINT_POINTS_2021,
        SessionType::Sprint if season >= 2022 => &SPRINT_POINTS,
        _ => &[],
    }
}

/// Championship points for finishing `position` in one session.
///
/// The fastest-lap bonus applies to races in 2019-2024 and only when the
/// holder finished in the top ten.
pub fn points_for(
    season: i32,
    session_type: SessionType,
    position: Option<u32>,
    holds_session_fastest: bool,
) -> f64 {
    let Some(position) = position.filter(|p| *p >= 1) else {
        return 0.0;
    };

    let base = table(season, session_type)
        .get(position as usize - 1)
        .copied()
        .unwrap_or(0);

    let bonus = session_type == SessionType::Race
        && holds_session_fastest
        && position <= 10
        && FASTEST_LAP_BONUS_SEASONS.contains(&season);

    f64::from(base + u32::from(bonus))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_race_points() {
        assert_eq!(points_for(2023, SessionType::Race, Some(1), false), 25.0);
        assert_eq!(points_for(2023, SessionType::Race, Some(10), false), 1.0);
        assert_eq!(points_for(2023, SessionType::Race, Some(11), false), 0.0);
        assert_eq!(points_for(2023, SessionType::Race, None, true), 0.0);
    }

    #[test]
    fn test_fastest_lap_bonus_window() {
        assert_eq!(points_for(2019, SessionType::Race, Some(3), true), 16.0);
        assert_eq!(points_for(2024, SessionType::Race, Some(11), true), 0.0);
        assert_eq!(points_for(2025, SessionType::Race, Some(1), true), 25.0);
        assert_eq!(points_for(2018, SessionType::Race, Some(1), true), 25.0);
    }

    #[test]
    fn test_sprint_points_by_era() {
        assert_eq!(points_for(2021, SessionType::Sprint, Some(1), false), 3.0);
        assert_eq!(points_for(2021, SessionType::Sprint, Some(4), false), 0.0);
        assert_eq!(points_for(2023, SessionType::Sprint, Some(1), true), 8.0);
        assert_eq!(points_for(2023, SessionType::Sprint, Some(8), false), 1.0);
    }

    #[test]
    fn test_non_scoring_sessions() {
        assert_eq!(points_for(2023, SessionType::Qualifying, Some(1), true), 0.0);
        assert_eq!(points_for(2023, SessionType::Practice1, Some(1), false), 0.0);
    }
}
