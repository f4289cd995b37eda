use std::path::{Path, PathBuf};

use apex_sim::cpu::CPUPolicy;
use apex_sim::loader;
use apex_sim::pipelined::pipeline::{Stage, StageSnapshot};
use apex_sim::program::Program;
use apex_sim::run_wrapper::run_program;
use plotters::prelude::{
    ChartBuilder, Color, IntoDrawingArea, IntoFont, Palette, Palette99, Rectangle, SVGBackend,
    SeriesLabelPosition, BLACK, WHITE,
};

/// Chart row of a stage: Fetch on top, Writeback at the bottom
fn stage_row(stage: Stage) -> f64 {
    4.0 - stage as usize as f64
}

/// Y axis label for a row, empty between rows
fn stage_label(y: f64) -> String {
    let index = 4 - y.round() as i64;
    usize::try_from(index)
        .ok()
        .and_then(|i| Stage::ALL.get(i))
        .map_or(String::new(), |stage| stage.name().to_string())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let param_tokens: Vec<String> = std::env::args().collect();
    let program_path =
        param_tokens.get(1).ok_or("You should specify exactly one program file")?;
    let output_path = match param_tokens.get(2) {
        Some(path) => PathBuf::from(path),
        None => PathBuf::from(program_path).with_extension("svg"),
    };

    let program = loader::load_program(Path::new(program_path))?;

    // Record which instruction sits in which stage every cycle
    let mut cycles: Vec<[StageSnapshot; 5]> = Vec::new();
    run_program(&program, CPUPolicy::default(), |_, snapshots| {
        cycles.push(*snapshots);
        Ok(())
    })?;

    // Plot the data
    let program_name = output_path.file_stem().and_then(|s| s.to_str()).unwrap_or("program");
    let plot_title = format!("Pipeline occupancy: {}", program_name);
    let n_cycles = cycles.len().max(1) as f64;

    let root = SVGBackend::new(&output_path, (1000, 400)).into_drawing_area();
    root.fill(&WHITE)?;

    let mut ctx = ChartBuilder::on(&root)
        .caption(plot_title.as_str(), ("sans-serif", 30).into_font())
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(90)
        .build_cartesian_2d(0.0..n_cycles, -0.5..4.5)?;

    ctx.configure_mesh()
        .disable_y_mesh()
        .x_desc("Cycle")
        .y_labels(5)
        .y_label_formatter(&|y: &f64| stage_label(*y))
        .draw()?;

    // One series per instruction, so the legend reads as the listing
    for (i, inst) in program.instructions().iter().enumerate() {
        let pc = Program::pc_of(i);
        let color = Palette99::pick(i).to_rgba();

        let cells = cycles.iter().enumerate().flat_map(|(cycle, snapshots)| {
            snapshots
                .iter()
                .filter(move |s| s.inst.is_some() && s.pc == pc)
                .map(move |s| {
                    let x = cycle as f64;
                    let y = stage_row(s.stage);
                    // Stalled and busy cycles are drawn faded
                    let style = if s.stalled || s.busy {
                        color.mix(0.3).filled()
                    } else {
                        color.filled()
                    };
                    Rectangle::new([(x + 0.05, y - 0.4), (x + 0.95, y + 0.4)], style)
                })
        });

        ctx.draw_series(cells)?
            .label(format!("pc({}) {}", pc, inst))
            .legend(move |(x, y)| Rectangle::new([(x, y - 5), (x + 15, y + 5)], color.filled()));
    }

    ctx.configure_series_labels()
        .position(SeriesLabelPosition::UpperRight)
        .background_style(&WHITE.mix(0.8))
        .border_style(&BLACK)
        .draw()?;

    root.present()?;
    eprintln!("Wrote {} cycles to {}", cycles.len(), output_path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rows_and_labels() {
        assert_eq!(stage_row(Stage::Fetch), 4.0);
        assert_eq!(stage_row(Stage::WriteBack), 0.0);
        for stage in Stage::ALL {
            assert_eq!(stage_label(stage_row(stage)), stage.name());
        }
        assert_eq!(stage_label(5.0), "");
        assert_eq!(stage_label(-1.0), "");
    }
}
