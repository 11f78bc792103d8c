/// Candidate spacings for latitude/longitude lines, coarsest first.
const STEPS: [f64; 20] = [
    90.0, 45.0, 30.0, 15.0, 10.0, 5.0, 2.0, 1.0, 0.5, 0.2, 0.1, 0.05, 0.02, 0.01, 0.005, 0.002,
    0.001, 0.0005, 0.0002, 0.0001,
];

pub struct Graticule {
    min_spacing: f32,
    visible: bool,
}

impl Graticule {
    pub fn new(min_spacing: f32, visible: bool) -> Self {
        Self {
            min_spacing,
            visible,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    /// Finest step whose lines stay at least `min_spacing` pixels apart.
    pub fn step_for(&self, pixels_per_degree: f64) -> f64 {
        STEPS
            .iter()
            .copied()
            .take_while(|step| step * pixels_per_degree >= self.min_spacing as f64)
            .last()
            .unwrap_or(STEPS[0])
    }

    /// Multiples of `step` between `from` and `to` inclusive.
    pub fn lines(from: f64, to: f64, step: f64) -> Vec<f64> {
        let (low, high) = if from <= to { (from, to) } else { (to, from) };
        let first = (low / step).ceil() as i64;
        let last = (high / step).floor() as i64;
        (first..=last).map(|k| k as f64 * step).collect()
    }

    /// Label such as `37.75°N`, with only as many decimals as the step needs.
    pub fn label(value: f64, step: f64, positive: char, negative: char) -> String {
        let decimals = (-step.log10().floor()).max(0.0) as usize;
        let hemisphere = if value < 0.0 {
            negative
        } else if value > 0.0 {
            positive
        } else {
            return format!("{:.*}°", decimals, 0.0);
        };
        format!("{:.*}°{}", decimals, value.abs(), hemisphere)
    }
}
