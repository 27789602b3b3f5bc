//! Keyframe search and interpolation

use cgmath::{InnerSpace, Quaternion, Vector3};

use super::clip::{AnimationSampler, Interpolation, TargetPath};
use crate::math::slerp_shortest;

/// Value produced by sampling a channel
#[derive(Debug, Clone, PartialEq)]
pub enum SampledValue {
    Translation(Vector3<f32>),
    Rotation(Quaternion<f32>),
    Scale(Vector3<f32>),
    Weights(Vec<f32>),
}

/// Locates the keyframes around `t`
///
/// Returns `(previous, next, u)` where `u` in `[0, 1]` is the position of
/// `t` between the two keyframe times. Times outside the keyframe range are
/// clamped to the first or last keyframe, and a NaN `t` maps to the first.
/// Unsorted or non-finite times never panic; they only bracket wrongly.
pub fn find_keyframes(times: &[f32], t: f32) -> (usize, usize, f32) {
    let last = times.len().saturating_sub(1);
    if times.is_empty() || t.is_nan() || t <= times[0] {
        return (0, 0, 0.0);
    }
    if last == 0 || t >= times[last] {
        return (last, last, 0.0);
    }

    let next = times.partition_point(|&key| key <= t).clamp(1, last);
    let previous = next - 1;
    let span = times[next] - times[previous];
    let u = if span > 0.0 {
        ((t - times[previous]) / span).clamp(0.0, 1.0)
    } else {
        0.0
    };
    (previous, next, if u.is_nan() { 0.0 } else { u })
}

/// Evaluates a sampler at local time `t`
///
/// Returns `None` when the sampler has no keyframes or its output is too
/// short for the keyframes it declares.
pub fn sample(sampler: &AnimationSampler, path: TargetPath, t: f32) -> Option<SampledValue> {
    let n = sampler.components;
    let stride = sampler.stride();
    if sampler.input.is_empty() || n == 0 || sampler.output.len() < sampler.input.len() * stride {
        return None;
    }

    let (k0, k1, u) = find_keyframes(&sampler.input, t);
    let dt = sampler.input[k1] - sampler.input[k0];

    let values: Vec<f32> = match sampler.interpolation {
        Interpolation::Step => value_at(sampler, k0).to_vec(),
        Interpolation::Linear => {
            if path == TargetPath::Rotation {
                let q0 = quat(value_at(sampler, k0));
                let q1 = quat(value_at(sampler, k1));
                return Some(SampledValue::Rotation(slerp_shortest(q0, q1, u)));
            }
            let (v0, v1) = (value_at(sampler, k0), value_at(sampler, k1));
            v0.iter().zip(v1).map(|(a, b)| a + (b - a) * u).collect()
        }
        Interpolation::CubicSpline => {
            let base0 = k0 * stride;
            let base1 = k1 * stride;
            let v0 = &sampler.output[base0 + n..base0 + 2 * n];
            let out0 = &sampler.output[base0 + 2 * n..base0 + 3 * n];
            let in1 = &sampler.output[base1..base1 + n];
            let v1 = &sampler.output[base1 + n..base1 + 2 * n];

            let (u2, u3) = (u * u, u * u * u);
            let h00 = 2.0 * u3 - 3.0 * u2 + 1.0;
            let h10 = u3 - 2.0 * u2 + u;
            let h01 = -2.0 * u3 + 3.0 * u2;
            let h11 = u3 - u2;

            (0..n)
                .map(|i| h00 * v0[i] + h10 * dt * out0[i] + h01 * v1[i] + h11 * dt * in1[i])
                .collect()
        }
    };

    Some(match path {
        TargetPath::Translation => SampledValue::Translation(vec3(&values)),
        TargetPath::Scale => SampledValue::Scale(vec3(&values)),
        TargetPath::Rotation => SampledValue::Rotation(quat(&values).normalize()),
        TargetPath::Weights => SampledValue::Weights(values),
    })
}

/// The keyframe's value, skipping cubic-spline tangents
fn value_at(sampler: &AnimationSampler, key: usize) -> &[f32] {
    let n = sampler.components;
    let start = match sampler.interpolation {
        Interpolation::CubicSpline => key * n * 3 + n,
        _ => key * n,
    };
    &sampler.output[start..start + n]
}

fn vec3(v: &[f32]) -> Vector3<f32> {
    Vector3::new(
        v.first().copied().unwrap_or(0.0),
        v.get(1).copied().unwrap_or(0.0),
        v.get(2).copied().unwrap_or(0.0),
    )
}

fn quat(v: &[f32]) -> Quaternion<f32> {
    Quaternion::new(
        v.get(3).copied().unwrap_or(1.0),
        v.first().copied().unwrap_or(0.0),
        v.get(1).copied().unwrap_or(0.0),
        v.get(2).copied().unwrap_or(0.0),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cgmath::{Deg, Rotation3};

    fn linear(input: Vec<f32>, output: Vec<f32>, components: usize) -> AnimationSampler {
        AnimationSampler {
            input,
            output,
            interpolation: Interpolation::Linear,
            components,
        }
    }

    #[test]
    fn test_find_keyframes_clamps_and_brackets() {
        let times = [0.0, 1.0, 3.0];
        assert_eq!(find_keyframes(&times, -1.0), (0, 0, 0.0));
        assert_eq!(find_keyframes(&times, 5.0), (2, 2, 0.0));
        assert_eq!(find_keyframes(&times, 1.0), (1, 2, 0.0));
        assert_eq!(find_keyframes(&times, 2.0), (1, 2, 0.5));
        assert_eq!(find_keyframes(&[0.5], 2.0), (0, 0, 0.0));
    }

    #[test]
    fn test_find_keyframes_survives_bad_times() {
        assert_eq!(find_keyframes(&[0.0, 1.0], f32::NAN), (0, 0, 0.0));

        let (k0, k1, u) = find_keyframes(&[f32::NAN, 1.0, 2.0], 1.5);
        assert!(k1 <= 2 && k0 + 1 == k1 && (0.0..=1.0).contains(&u));

        let (k0, k1, u) = find_keyframes(&[0.0, 3.0, 1.0, 4.0], 0.5);
        assert!(k1 <= 3 && k0 + 1 == k1 && (0.0..=1.0).contains(&u));

        let (_, _, u) = find_keyframes(&[0.0, f32::INFINITY, f32::INFINITY], 1.0);
        assert!(u.is_finite());
        assert_eq!(find_keyframes(&[f32::NAN], 1.0), (0, 0, 0.0));
    }

    #[test]
    fn test_linear_translation_midpoint() {
        let s = linear(vec![0.0, 2.0], vec![0.0, 0.0, 0.0, 1.0, 0.0, 0.0], 3);
        let Some(SampledValue::Translation(v)) = sample(&s, TargetPath::Translation, 1.0) else {
            panic!("expected translation");
        };
        assert!((v.x - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_step_holds_previous_value() {
        let mut s = linear(vec![0.0, 1.0], vec![1.0, 1.0, 1.0, 2.0, 2.0, 2.0], 3);
        s.interpolation = Interpolation::Step;
        assert_eq!(
            sample(&s, TargetPath::Scale, 0.99),
            Some(SampledValue::Scale(Vector3::new(1.0, 1.0, 1.0)))
        );
        assert_eq!(
            sample(&s, TargetPath::Scale, 1.0),
            Some(SampledValue::Scale(Vector3::new(2.0, 2.0, 2.0)))
        );
    }

    #[test]
    fn test_rotation_takes_shorter_arc() {
        let a = Quaternion::from_angle_y(Deg(10.0));
        let b = -Quaternion::from_angle_y(Deg(30.0));
        let output = vec![a.v.x, a.v.y, a.v.z, a.s, b.v.x, b.v.y, b.v.z, b.s];
        let s = linear(vec![0.0, 1.0], output, 4);

        let Some(SampledValue::Rotation(q)) = sample(&s, TargetPath::Rotation, 0.5) else {
            panic!("expected rotation");
        };
        let expected = Quaternion::from_angle_y(Deg(20.0));
        assert!((q.dot(expected).abs() - 1.0).abs() < 1e-5);
    }

    #[test]
    fn test_cubic_spline_hits_keyframes_and_uses_tangents() {
        // One component; in, value, out per key. Zero tangents give smoothstep.
        let s = AnimationSampler {
            input: vec![0.0, 2.0],
            output: vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0],
            interpolation: Interpolation::CubicSpline,
            components: 1,
        };
        let at = |t| match sample(&s, TargetPath::Weights, t) {
            Some(SampledValue::Weights(w)) => w[0],
            _ => panic!("expected weights"),
        };
        assert_eq!(at(0.0), 0.0);
        assert_eq!(at(2.0), 1.0);
        assert!((at(1.0) - 0.5).abs() < 1e-6);
        assert!(at(0.5) < 0.25);

        // A positive out-tangent on key 0 lifts the early curve
        let mut tangent = s.clone();
        tangent.output[2] = 1.0;
        let lifted = match sample(&tangent, TargetPath::Weights, 0.5) {
            Some(SampledValue::Weights(w)) => w[0],
            _ => panic!("expected weights"),
        };
        assert!(lifted > at(0.5));
    }

    #[test]
    fn test_short_output_is_rejected() {
        let s = linear(vec![0.0, 1.0], vec![0.0; 3], 3);
        assert!(sample(&s, TargetPath::Translation, 0.5).is_none());
    }
}
