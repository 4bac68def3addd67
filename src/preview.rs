use std::fmt::Write;

use crate::config::TierColors;
use crate::docx::escape_xml as escape;
use crate::grid::Grid;
use crate::models::{normalize, Tier, Trimester};

const BORDER: &str = "border:1px solid #000;";

/// Renders the tracking grid as a colored HTML table fragment.
pub fn render_table(grid: &Grid, colors: &TierColors) -> String {
    let mut html = String::new();

    let _ = write!(
        html,
        "<div style='font-family:Calibri;font-size:11pt;overflow:auto;'>\
         <table style='border-collapse:collapse;width:100%;'>"
    );

    let _ = write!(
        html,
        "<tr><th rowspan='2' style='{BORDER}padding:6px;width:40%;'>OBJETIVO</th>"
    );
    for tier in Tier::ALL {
        let _ = write!(
            html,
            "<th colspan='3' style='{BORDER}padding:6px;background:{};'>{}</th>",
            colors.css(tier),
            escape(tier.label())
        );
    }
    let _ = write!(html, "</tr><tr>");
    for _ in Tier::ALL {
        for trimester in Trimester::ALL {
            let _ = write!(
                html,
                "<th style='{BORDER}padding:4px;width:6%;'>{}</th>",
                escape(trimester.label())
            );
        }
    }
    let _ = write!(html, "</tr>");

    for row in grid.rows() {
        let _ = write!(
            html,
            "<tr><td style='{BORDER}padding:6px;'>{}</td>",
            escape(&row.objective)
        );
        for tier in Tier::ALL {
            for trimester in Trimester::ALL {
                let _ = write!(
                    html,
                    "<td style='{BORDER}text-align:center;background:{};'>{}</td>",
                    colors.css(tier),
                    escape(&normalize(row.raw(tier, trimester)))
                );
            }
        }
        let _ = write!(html, "</tr>");
    }

    let _ = write!(html, "</table></div>");
    html
}

/// Standalone page around [`render_table`], written by the `preview` command.
pub fn render_page(title: &str, grid: &Grid, colors: &TierColors) -> String {
    let mut html = String::new();
    let _ = writeln!(html, "<!DOCTYPE html>");
    let _ = writeln!(html, "<html lang='es'>");
    let _ = writeln!(
        html,
        "<head><meta charset='utf-8'><title>{}</title></head>",
        escape(title)
    );
    let _ = writeln!(html, "<body>");
    let _ = writeln!(html, "{}", render_table(grid, colors));
    let _ = writeln!(html, "</body>");
    let _ = writeln!(html, "</html>");
    html
}
