//! Command-line front end for the plotting engine.  Queues one plot,
//! drives a worker until it completes, and writes the result as a
//! PNG.  Everything interesting happens in the library; this file is
//! argument parsing and the image-container hand-off.

use std::fs::File;
use std::path::Path;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use clap::{App, Arg, ArgMatches};
use image::png::PNGEncoder;
use image::ColorType;

use buddhabrot_engine::{
    BuddhabrotParameters, MandelbrotParameters, MemoryRepository, PlotParameters, PlotRepository,
    PlotState, PlotWorker, SampleSize,
};

/// Given a string and a separator, returns the two values separated
/// by the separator.
fn parse_pair<T: FromStr>(s: &str, separator: char) -> Option<(T, T)> {
    match s.find(separator) {
        None => None,
        Some(index) => match (T::from_str(&s[..index]), T::from_str(&s[index + 1..])) {
            (Ok(l), Ok(r)) => Some((l, r)),
            _ => None,
        },
    }
}

fn validate_pair<T: FromStr>(s: &str, separator: char, err: &str) -> Result<(), String> {
    match parse_pair::<T>(s, separator) {
        Some(_) => Ok(()),
        None => Err(err.to_string()),
    }
}

fn validate_number<T: FromStr>(s: &str, err: &str) -> Result<(), String> {
    match T::from_str(s) {
        Ok(_) => Ok(()),
        Err(_) => Err(err.to_string()),
    }
}

/// A sample size is either an absolute count ("50000") or a fraction
/// of the pixel count ("0.1").
fn parse_samples(s: &str) -> Option<SampleSize> {
    if s.contains('.') {
        f64::from_str(s).ok().map(SampleSize::Fraction)
    } else {
        u64::from_str(s).ok().map(SampleSize::Count)
    }
}

const OUTPUT: &str = "output";
const TYPE: &str = "type";
const SIZE: &str = "size";
const ITERATIONS: &str = "iterations";
const SAMPLE_ITERATIONS: &str = "sample-iterations";
const SAMPLES: &str = "samples";
const PASSES: &str = "passes";
const GRAYSCALE: &str = "grayscale";
const THREADS: &str = "threads";

fn args<'a>() -> ArgMatches<'a> {
    App::new("buddha")
        .version("0.1.0")
        .about("Mandelbrot and Buddhabrot plotter")
        .arg(
            Arg::with_name(OUTPUT)
                .required(true)
                .long(OUTPUT)
                .short("o")
                .takes_value(true)
                .help("Output PNG file"),
        )
        .arg(
            Arg::with_name(TYPE)
                .long(TYPE)
                .short("p")
                .takes_value(true)
                .possible_values(&["mandelbrot", "buddhabrot"])
                .default_value("buddhabrot")
                .help("Which plotter to run"),
        )
        .arg(
            Arg::with_name(SIZE)
                .long(SIZE)
                .short("s")
                .takes_value(true)
                .default_value("800x600")
                .validator(|s| validate_pair::<usize>(&s, 'x', "Could not parse output image size"))
                .help("Size of output image"),
        )
        .arg(
            Arg::with_name(ITERATIONS)
                .long(ITERATIONS)
                .short("i")
                .takes_value(true)
                .default_value("2000")
                .validator(|s| validate_number::<usize>(&s, "Could not parse iteration count"))
                .help("Iteration cap for orbit evaluation"),
        )
        .arg(
            Arg::with_name(SAMPLE_ITERATIONS)
                .long(SAMPLE_ITERATIONS)
                .takes_value(true)
                .default_value("200")
                .validator(|s| {
                    validate_number::<usize>(&s, "Could not parse sample iteration count")
                })
                .help("Iteration cap for rejecting in-set sample candidates (buddhabrot)"),
        )
        .arg(
            Arg::with_name(SAMPLES)
                .long(SAMPLES)
                .takes_value(true)
                .default_value("0.3")
                .validator(|s| match parse_samples(&s) {
                    Some(_) => Ok(()),
                    None => Err("Could not parse sample size".to_string()),
                })
                .help("Sample candidates per run: a count, or a fraction of the pixel count"),
        )
        .arg(
            Arg::with_name(PASSES)
                .long(PASSES)
                .takes_value(true)
                .default_value("1")
                .validator(|s| validate_number::<usize>(&s, "Could not parse pass count"))
                .help("How many sample-and-accumulate passes to run (buddhabrot)"),
        )
        .arg(
            Arg::with_name(GRAYSCALE)
                .long(GRAYSCALE)
                .short("g")
                .help("Accumulate a single clamped grayscale plane instead of RGB channels"),
        )
        .arg(
            Arg::with_name(THREADS)
                .long(THREADS)
                .short("t")
                .takes_value(true)
                .validator(|s| validate_number::<usize>(&s, "Could not parse thread count"))
                .help("Number of render threads (default: one per CPU)"),
        )
        .get_matches()
}

fn write_image(outfile: &str, pixels: &[u8], width: usize, height: usize) -> std::io::Result<()> {
    let output = File::create(Path::new(outfile))?;
    PNGEncoder::new(output).encode(pixels, width as u32, height as u32, ColorType::RGB(8))?;
    Ok(())
}

fn run() -> Result<(), String> {
    let matches = args();
    let (width, height) =
        parse_pair::<usize>(matches.value_of(SIZE).unwrap(), 'x').expect("validated");
    let max_iterations = usize::from_str(matches.value_of(ITERATIONS).unwrap()).expect("validated");
    let threads = match matches.value_of(THREADS) {
        Some(t) => usize::from_str(t).expect("validated"),
        None => num_cpus::get(),
    };

    let parameters = match matches.value_of(TYPE).unwrap() {
        "mandelbrot" => PlotParameters::Mandelbrot(MandelbrotParameters {
            width,
            height,
            max_iterations,
        }),
        _ => PlotParameters::Buddhabrot(BuddhabrotParameters {
            width,
            height,
            max_iterations,
            max_sample_iterations: usize::from_str(
                matches.value_of(SAMPLE_ITERATIONS).unwrap(),
            )
            .expect("validated"),
            sample_size: parse_samples(matches.value_of(SAMPLES).unwrap()).expect("validated"),
            passes: usize::from_str(matches.value_of(PASSES).unwrap()).expect("validated"),
            grayscale: matches.is_present(GRAYSCALE),
        }),
    };

    // The full queue-and-worker pipeline, in miniature: enqueue the
    // request, let a worker claim and plot it, then read the record
    // back and hand the bytes to the encoder.
    let repository = Arc::new(MemoryRepository::new());
    let id = repository
        .enqueue(parameters)
        .map_err(|e| e.to_string())?;
    let worker = PlotWorker::new(repository.clone())
        .threads(threads)
        .idle(Duration::from_millis(50));
    worker.poll_once().map_err(|e| e.to_string())?;

    let plot = repository
        .find(id)
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("plot {} vanished from the repository", id))?;
    match plot.state() {
        PlotState::Complete => {}
        state => return Err(format!("plot {} did not complete: {:?}", id, state)),
    }
    let image = plot
        .image_data
        .ok_or_else(|| "plot completed without image data".to_string())?;
    write_image(matches.value_of(OUTPUT).unwrap(), &image, width, height)
        .map_err(|e| format!("could not write image: {}", e))
}

fn main() {
    env_logger::init();
    if let Err(e) = run() {
        eprintln!("Render failure: {}", e);
        std::process::exit(1);
    }
}
