/// Loss curve `x² + 1` with a ball that steps against the gradient
#[derive(Debug, Clone, PartialEq)]
pub struct GradientHill {
    pub position: f64,
    pub learning_rate: f64,
}

impl Default for GradientHill {
    fn default() -> Self {
        Self {
            position: -3.0,
            learning_rate: 0.2,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StepDirection {
    Left,
    Right,
}

impl GradientHill {
    pub fn loss_at(x: f64) -> f64 {
        x * x + 1.0
    }

    pub fn loss(&self) -> f64 {
        Self::loss_at(self.position)
    }

    pub fn gradient(&self) -> f64 {
        2.0 * self.position
    }

    /// Downhill is opposite the gradient
    pub fn recommended_direction(&self) -> StepDirection {
        if self.gradient() > 0.0 {
            StepDirection::Left
        } else {
            StepDirection::Right
        }
    }

    pub fn step(&mut self) {
        self.position -= self.learning_rate * self.gradient();
    }

    /// 21 samples over [-5, 5]
    pub fn curve() -> Vec<(f64, f64)> {
        (0..21)
            .map(|i| {
                let x = (i as f64 - 10.0) / 2.0;
                (x, Self::loss_at(x))
            })
            .collect()
    }
}
