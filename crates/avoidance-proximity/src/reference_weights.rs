//! Weights pulling a reference point toward nearby obstacles

/// Weight of each neighbour in the relocation of one obstacle's reference point.
///
/// `distances[j]` is the resolved distance to neighbour `j` (negative for the
/// obstacle itself and unresolved pairs) and `reference_sizes[j]` its
/// characteristic size. Intersecting neighbours (distance 0) share the whole
/// weight equally. Otherwise neighbours closer than `distance_max` get the
/// normalized inverse-distance weight, scaled down by how far the reference
/// point may move given the neighbour's size; the weights then sum to less
/// than one so distant neighbours only nudge the reference point.
pub fn reference_weights(distances: &[f64], reference_sizes: &[f64], distance_max: f64, power: f64) -> Vec<f64> {
    let mut weights = vec![0.0; distances.len()];

    let touching = distances.iter().filter(|distance| **distance == 0.0).count();
    if touching > 0 {
        for (weight, distance) in weights.iter_mut().zip(distances) {
            if *distance == 0.0 {
                *weight = 1.0 / touching as f64;
            }
        }
        return weights;
    }

    let in_range = |distance: f64| distance > 0.0 && distance < distance_max;
    for (weight, distance) in weights.iter_mut().zip(distances) {
        if in_range(*distance) {
            *weight = (1.0 / distance - 1.0 / distance_max).powf(power);
        }
    }

    let sum: f64 = weights.iter().sum();
    if sum == 0.0 {
        return weights;
    }

    for ((weight, distance), size) in weights.iter_mut().zip(distances).zip(reference_sizes) {
        if !in_range(*distance) {
            continue;
        }
        let displacement = 1.0 / (distance + 1.0) - 1.0 / (distance_max * size + 1.0);
        *weight = (*weight / sum * displacement).max(0.0);
    }
    weights
}
