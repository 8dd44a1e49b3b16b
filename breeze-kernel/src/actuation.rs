/// Population at which the fan runs at full power.
pub const P_MAX: f64 = 2.0;

/// Maps a detected population to a fan power in `[0, 1]`.
///
/// NaN means "no data" and is propagated so the unit can tell it apart from
/// an empty room.
pub fn population_to_actuation(population: f64) -> f64 {
    if population.is_nan() {
        return f64::NAN;
    }
    population.clamp(0.0, P_MAX) / P_MAX
}
