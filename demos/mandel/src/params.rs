use serde::{Deserialize, Serialize};

/// Shared description of the image every node renders rows of.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MandelParams {
    pub re1: f64,
    pub re2: f64,
    pub im1: f64,
    pub im2: f64,
    pub width: u32,
    pub height: u32,
    pub max_iteration: u32,
}

impl Default for MandelParams {
    fn default() -> Self {
        MandelParams {
            re1: -2.0,
            re2: 1.0,
            im1: -1.5,
            im2: 1.5,
            width: 2048,
            height: 2048,
            max_iteration: 2048,
        }
    }
}

impl MandelParams {
    pub fn re_step(&self) -> f64 {
        (self.re2 - self.re1) / f64::from(self.width)
    }

    pub fn im_step(&self) -> f64 {
        (self.im2 - self.im1) / f64::from(self.height)
    }

    /// Iteration counts for one row of the image.
    pub fn render_row(&self, row: u32) -> Vec<u32> {
        let im = self.im1 + self.im_step() * f64::from(row);

        (0..self.width)
            .map(|column| {
                let re = self.re1 + self.re_step() * f64::from(column);
                self.iterate(re, im)
            })
            .collect()
    }

    /// Escape-time iteration count for one point of the plane.
    fn iterate(&self, c_re: f64, c_im: f64) -> u32 {
        let mut z_re = 0.0f64;
        let mut z_im = 0.0f64;
        let mut iteration = 0;

        while iteration < self.max_iteration && z_re * z_re + z_im * z_im <= 4.0 {
            let next_re = z_re * z_re - z_im * z_im + c_re;
            z_im = 2.0 * z_re * z_im + c_im;
            z_re = next_re;
            iteration += 1;
        }

        iteration
    }
}
