// Report rendering for the command-line driver

use std::io::{self, Write};

use serde::Serialize;

use crate::config::OutputFormat;
use crate::ellipsoid::Ellipsoid;
use crate::error::Result;
use crate::geodesy::{cartesian_to_geodetic, geodetic_to_cartesian};
use crate::point::{CartesianPoint, GeodeticPoint};
use crate::solver::{SolverConfig, SolverMethod};

/// Geodetic -> Cartesian -> geodetic comparison
#[derive(Debug, Clone, Serialize)]
pub struct RoundTripReport {
    pub entered: GeodeticPoint,
    pub cartesian: CartesianPoint,
    pub recovered: GeodeticPoint,
    pub method: SolverMethod,
    pub iterations: usize,
    pub evaluations: usize,
    /// Distance between `cartesian` and `recovered` mapped back to Cartesian
    pub closure_error: f64,
}

impl RoundTripReport {
    pub fn build(entered: GeodeticPoint, ellipsoid: &Ellipsoid, config: &SolverConfig) -> Result<Self> {
        let cartesian = geodetic_to_cartesian(entered, ellipsoid)?;
        let conversion = cartesian_to_geodetic(cartesian, ellipsoid, config)?;
        let closure = geodetic_to_cartesian(conversion.geodetic, ellipsoid)?;

        Ok(Self {
            entered,
            cartesian,
            recovered: conversion.geodetic,
            method: config.method,
            iterations: conversion.iterations,
            evaluations: conversion.evaluations,
            closure_error: cartesian.distance(&closure),
        })
    }
}

/// Single Cartesian -> geodetic conversion
#[derive(Debug, Clone, Serialize)]
pub struct ConversionReport {
    pub cartesian: CartesianPoint,
    pub geodetic: GeodeticPoint,
    pub method: SolverMethod,
    pub iterations: usize,
    pub evaluations: usize,
}

impl ConversionReport {
    pub fn build(cartesian: CartesianPoint, ellipsoid: &Ellipsoid, config: &SolverConfig) -> Result<Self> {
        let conversion = cartesian_to_geodetic(cartesian, ellipsoid, config)?;
        Ok(Self {
            cartesian,
            geodetic: conversion.geodetic,
            method: config.method,
            iterations: conversion.iterations,
            evaluations: conversion.evaluations,
        })
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Report {
    RoundTrip(RoundTripReport),
    Conversion(ConversionReport),
}

/// Trait for report writers
pub trait ReportWriter {
    fn write_report(&mut self, report: &Report) -> io::Result<()>;
}

/// Human-readable output
pub struct TextOutput<W: Write> {
    writer: W,
}

impl<W: Write> TextOutput<W> {
    pub fn new(writer: W) -> Self {
        TextOutput { writer }
    }
}

impl<W: Write> ReportWriter for TextOutput<W> {
    fn write_report(&mut self, report: &Report) -> io::Result<()> {
        let w = &mut self.writer;
        writeln!(w)?;
        writeln!(w, "RESULTS:")?;
        match report {
            Report::RoundTrip(r) => {
                writeln!(
                    w,
                    "Entered (lat, long, h) = ({}, {}, {})",
                    r.entered.latitude, r.entered.longitude, r.entered.height
                )?;
                writeln!(
                    w,
                    "Equivalent (x, y, z) = ({}, {}, {})",
                    r.cartesian.x, r.cartesian.y, r.cartesian.z
                )?;
                writeln!(
                    w,
                    "Converting these cartesian coords back to geodetic coords: ({}, {}, {})",
                    r.recovered.latitude, r.recovered.longitude, r.recovered.height
                )?;
                writeln!(w, "Round-trip closure error: {:e}", r.closure_error)?;
                writeln!(
                    w,
                    "Numerical root finding ({}) took {} iterations, {} evaluations",
                    r.method, r.iterations, r.evaluations
                )?;
            }
            Report::Conversion(r) => {
                writeln!(
                    w,
                    "Entered (x, y, z) = ({}, {}, {})",
                    r.cartesian.x, r.cartesian.y, r.cartesian.z
                )?;
                writeln!(
                    w,
                    "Geodetic (lat, long, h) = ({}, {}, {})",
                    r.geodetic.latitude, r.geodetic.longitude, r.geodetic.height
                )?;
                writeln!(
                    w,
                    "Numerical root finding ({}) took {} iterations, {} evaluations",
                    r.method, r.iterations, r.evaluations
                )?;
            }
        }
        writeln!(w)?;
        w.flush()
    }
}

/// Pretty-printed JSON, one document per report
pub struct JsonOutput<W: Write> {
    writer: W,
}

impl<W: Write> JsonOutput<W> {
    pub fn new(writer: W) -> Self {
        JsonOutput { writer }
    }
}

impl<W: Write> ReportWriter for JsonOutput<W> {
    fn write_report(&mut self, report: &Report) -> io::Result<()> {
        serde_json::to_writer_pretty(&mut self.writer, report)?;
        writeln!(self.writer)?;
        self.writer.flush()
    }
}

pub fn report_writer<W: Write + 'static>(format: OutputFormat, writer: W) -> Box<dyn ReportWriter> {
    match format {
        OutputFormat::Text => Box::new(TextOutput::new(writer)),
        OutputFormat::Json => Box::new(JsonOutput::new(writer)),
    }
}
