use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use segcurve::{Point, RowIntegralField};

const WIDTH: usize = 12;
const HEIGHT: usize = 9;

fn random_field(rng: &mut StdRng) -> RowIntegralField {
    let data: Vec<f32> = (0..WIDTH * HEIGHT)
        .map(|_| rng.random_range(-2.0f32..2.0f32))
        .collect();
    RowIntegralField::from_data_term(&data, WIDTH, HEIGHT).unwrap()
}

/// Midpoint Riemann sum of the prefix-interpolated model along a segment.
///
/// Within every pixel-row band the column integral is linear in x, so a fine
/// midpoint sum converges to the closed-form edge energy.
fn brute_force_line_energy(field: &RowIntegralField, a: Point, b: Point, steps: usize) -> f64 {
    let dy = (b.y - a.y) / steps as f64;
    let mut sum = 0.0;
    for k in 0..steps {
        let t = (k as f64 + 0.5) / steps as f64;
        let x = (1.0 - t) * a.x + t * b.x;
        let y = (1.0 - t) * a.y + t * b.y;
        sum += field.column_integral(x, y.floor() as i64) * dy;
    }
    sum
}

#[test]
fn line_energy_matches_brute_force_integral() {
    let mut rng = StdRng::seed_from_u64(0x5e6);
    let field = random_field(&mut rng);

    let segments = [
        // Axis-aligned.
        (Point::new(2.0, 1.5), Point::new(2.0, 7.5)),
        (Point::new(1.25, 4.0), Point::new(9.75, 4.0)),
        // Diagonals with sub-pixel endpoints.
        (Point::new(1.3, 1.7), Point::new(10.6, 7.2)),
        (Point::new(9.8, 0.4), Point::new(0.7, 8.1)),
        // Steep and shallow.
        (Point::new(5.5, 0.25), Point::new(6.0, 8.75)),
        (Point::new(0.1, 3.9), Point::new(11.9, 4.6)),
    ];

    for (a, b) in segments {
        let exact = field.line_energy(a, b);
        let approx = brute_force_line_energy(&field, a, b, 400_000);
        assert!(
            (exact - approx).abs() < 1e-3,
            "segment {a:?} -> {b:?}: exact {exact}, brute force {approx}"
        );
    }
}

#[test]
fn line_energy_matches_brute_force_on_random_segments() {
    let mut rng = StdRng::seed_from_u64(42);
    let field = random_field(&mut rng);

    for _ in 0..8 {
        let a = Point::new(
            rng.random_range(0.5..WIDTH as f64 - 0.5),
            rng.random_range(0.5..HEIGHT as f64 - 0.5),
        );
        let b = Point::new(
            rng.random_range(0.5..WIDTH as f64 - 0.5),
            rng.random_range(0.5..HEIGHT as f64 - 0.5),
        );
        if (a.y - b.y).abs() < 1e-3 {
            continue;
        }
        let exact = field.line_energy(a, b);
        let approx = brute_force_line_energy(&field, a, b, 400_000);
        assert!(
            (exact - approx).abs() < 1e-3,
            "segment {a:?} -> {b:?}: exact {exact}, brute force {approx}"
        );
    }
}

#[test]
fn polygon_energy_is_cyclically_invariant() {
    let mut rng = StdRng::seed_from_u64(7);
    let field = random_field(&mut rng);

    let polygon: Vec<Point> = (0..7)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / 7.0;
            let radius = rng.random_range(1.5..3.5);
            Point::new(6.0 + radius * angle.cos(), 4.5 + radius * angle.sin())
        })
        .collect();
    let energy = field.polygon_energy(&polygon);

    for shift in 1..polygon.len() {
        let mut rotated = polygon.clone();
        rotated.rotate_left(shift);
        assert!((field.polygon_energy(&rotated) - energy).abs() < 1e-9);
    }
}

#[test]
fn reversing_traversal_negates_polygon_energy() {
    let mut rng = StdRng::seed_from_u64(11);
    let field = random_field(&mut rng);

    let polygon = vec![
        Point::new(2.25, 1.5),
        Point::new(9.5, 2.75),
        Point::new(10.0, 7.0),
        Point::new(5.5, 8.25),
        Point::new(1.75, 6.0),
    ];
    let forward = field.polygon_energy(&polygon);
    let reversed: Vec<Point> = polygon.iter().rev().copied().collect();
    assert!((field.polygon_energy(&reversed) + forward).abs() < 1e-9);
    assert!(forward.abs() > 0.0, "degenerate test polygon");
}
