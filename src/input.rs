// Interactive input for the command-line driver

use std::io::{self, BufRead, Write};

use tracing::warn;

use crate::point::GeodeticPoint;

/// Prompt for a number until a line parses as a finite f64.
///
/// # Errors
/// I/O errors from either stream, or `UnexpectedEof` when input runs out.
pub fn prompt_f64<R: BufRead, W: Write>(label: &str, input: &mut R, output: &mut W) -> io::Result<f64> {
    loop {
        write!(output, "Enter {}: ", label)?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                format!("no value entered for {}", label),
            ));
        }

        match line.trim().parse::<f64>() {
            Ok(value) if value.is_finite() => return Ok(value),
            _ => warn!("Invalid {} '{}', expected a number", label, line.trim()),
        }
    }
}

/// Use the values given on the command line, prompting for the missing ones
pub fn read_geodetic<R: BufRead, W: Write>(
    latitude: Option<f64>,
    longitude: Option<f64>,
    height: Option<f64>,
    input: &mut R,
    output: &mut W,
) -> io::Result<GeodeticPoint> {
    let mut resolve = |value: Option<f64>, label: &str| match value {
        Some(v) => Ok(v),
        None => prompt_f64(label, input, output),
    };

    let latitude = resolve(latitude, "latitude")?;
    let longitude = resolve(longitude, "longitude")?;
    let height = resolve(height, "height")?;
    Ok(GeodeticPoint::new(latitude, longitude, height))
}
