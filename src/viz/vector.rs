//! Query/key alignment demo behind the VECTOR_ALIGNMENT renderer.

pub const MAGNITUDE: f64 = 10.0;

/// Softmax temperature applied to raw dot products
const SCORE_SCALE: f64 = 50.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyVector {
    pub label: &'static str,
    pub angle_deg: f64,
    /// Length of the value vector paired with this key
    pub value_len: f64,
}

pub const KEYS: [KeyVector; 3] = [
    KeyVector {
        label: "K1",
        angle_deg: 60.0,
        value_len: 8.0,
    },
    KeyVector {
        label: "K2",
        angle_deg: 150.0,
        value_len: 5.0,
    },
    KeyVector {
        label: "K3",
        angle_deg: 300.0,
        value_len: 3.0,
    },
];

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KeyScore {
    pub key: KeyVector,
    pub dot: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Layers {
    pub dot: bool,
    pub softmax: bool,
    pub output: bool,
}

impl Default for Layers {
    fn default() -> Self {
        Self { dot: true, softmax: true, output: true }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct VectorPlayground {
    pub query_angle: f64,
    pub layers: Layers,
}

impl Default for VectorPlayground {
    fn default() -> Self {
        Self { query_angle: 90.0, layers: Layers::default() }
    }
}

pub fn polar(angle_deg: f64, length: f64) -> (f64, f64) {
    let rad = angle_deg.to_radians();
    (length * rad.cos(), length * rad.sin())
}

impl VectorPlayground {
    pub fn query(&self) -> (f64, f64) {
        polar(self.query_angle, MAGNITUDE)
    }

    /// Rotate the query, wrapping into [0, 360)
    pub fn rotate(&mut self, delta_deg: f64) {
        self.query_angle = (self.query_angle + delta_deg).rem_euclid(360.0);
    }

    /// Dot products rounded to one decimal, then softmax over `dot / 50`
    pub fn scores(&self) -> Vec<KeyScore> {
        let (qx, qy) = self.query();
        let dots: Vec<f64> = KEYS
            .iter()
            .map(|k| {
                let (kx, ky) = polar(k.angle_deg, MAGNITUDE);
                ((qx * kx + qy * ky) * 10.0).round() / 10.0
            })
            .collect();

        let exps: Vec<f64> = dots.iter().map(|d| (d / SCORE_SCALE).exp()).collect();
        let sum: f64 = exps.iter().sum();

        KEYS.iter()
            .zip(dots.iter().zip(exps.iter()))
            .map(|(key, (dot, e))| KeyScore { key: *key, dot: *dot, weight: e / sum })
            .collect()
    }

    /// Weighted sum of value vectors; values point along their keys
    pub fn output(&self) -> (f64, f64) {
        self.scores().iter().fold((0.0, 0.0), |(ax, ay), s| {
            let (vx, vy) = polar(s.key.angle_deg, s.key.value_len);
            (ax + vx * s.weight, ay + vy * s.weight)
        })
    }

    pub fn toggle_dot(&mut self) {
        self.layers.dot = !self.layers.dot;
    }

    pub fn toggle_softmax(&mut self) {
        self.layers.softmax = !self.layers.softmax;
    }

    pub fn toggle_output(&mut self) {
        self.layers.output = !self.layers.output;
    }
}
