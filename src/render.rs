//! SVG and HTML output.
//!
//! Rendering is a pure function of the loaded [`MapModel`] and the current
//! [`HoverState`]; nothing here mutates either.

use crate::classify::{classify, BUCKETS};
use crate::topology::{fmt_number, PathData};
use crate::tooltip::{HoverState, Tooltip, DEFAULT_STROKE, EMPHASIS_STROKE, TOOLTIP_OFFSET};
use crate::types::MapModel;
use std::fmt::Write;

pub const WIDTH: f64 = 960.0;
pub const HEIGHT: f64 = 600.0;

const LEGEND_WIDTH: f64 = 400.0;
const LEGEND_HEIGHT: f64 = 20.0;
const LEGEND_BOTTOM_OFFSET: f64 = 60.0;
const LEGEND_LABEL_GAP: f64 = 15.0;

const BORDER_STROKE: &str = "#333";
const FONT_FAMILY: &str = "Inter, system-ui, sans-serif";

pub const TITLE: &str = "United States Educational Attainment";
pub const DESCRIPTION: &str =
    "Percentage of adults age 25 and older with a bachelor's degree or higher (2010-2014)";
const HINT: &str = "Hover over counties to see detailed information";
const LOADING: &str = "Loading choropleth map...";

/// Escape the five XML special characters for text and attribute values.
fn xml_escape(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            other => out.push(other),
        }
    }
    out
}

/// The map as a standalone SVG document: county fills, then state borders,
/// then the legend.
pub fn render_svg(model: &MapModel, hover: &HoverState) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{w}" height="{h}" viewBox="0 0 {w} {h}" style="width:100%;height:auto">"#,
        w = WIDTH,
        h = HEIGHT,
    );

    write_counties(&mut out, model, hover);

    let _ = writeln!(
        out,
        r#"  <path id="state-borders" d="{}" fill="none" stroke="{BORDER_STROKE}" stroke-width="1" stroke-linejoin="round"/>"#,
        model.state_borders.path_data(),
    );

    write_legend(&mut out);
    out.push_str("</svg>\n");
    out
}

fn write_counties(out: &mut String, model: &MapModel, hover: &HoverState) {
    out.push_str("  <g id=\"counties\">\n");
    for county in &model.counties {
        let stroke = county
            .fips
            .map_or(DEFAULT_STROKE, |fips| hover.stroke_for(fips));
        let _ = write!(
            out,
            r#"    <path class="county" d="{}" data-fips="{}" data-education="{}""#,
            county.geometry.path_data(),
            xml_escape(&county.label),
            county.education(),
        );
        if let Some(record) = &county.record {
            let _ = write!(
                out,
                r#" data-name="{}" data-state="{}""#,
                xml_escape(&record.area_name),
                xml_escape(&record.state),
            );
        }
        let _ = writeln!(
            out,
            r#" fill="{}" stroke="{}" stroke-width="{}"/>"#,
            county.fill,
            stroke.color,
            stroke.width,
        );
    }
    out.push_str("  </g>\n");
}

/// Five equal swatches centred under the map. Swatch colours come from the
/// classifier so the legend cannot drift from the fills.
fn write_legend(out: &mut String) {
    let x = (WIDTH - LEGEND_WIDTH) / 2.0;
    let y = HEIGHT - LEGEND_BOTTOM_OFFSET;
    let item_width = LEGEND_WIDTH / BUCKETS.len() as f64;

    let _ = writeln!(out, r#"  <g id="legend" transform="translate({x}, {y})">"#);
    for (i, bucket) in BUCKETS.iter().enumerate() {
        let _ = writeln!(
            out,
            r##"    <rect class="legend-item" x="{}" y="0" width="{item_width}" height="{LEGEND_HEIGHT}" fill="{}" stroke="#fff" stroke-width="1"/>"##,
            fmt_number(i as f64 * item_width),
            classify(bucket.lower_bound),
        );
    }
    for (i, bucket) in BUCKETS.iter().enumerate() {
        let _ = writeln!(
            out,
            r##"    <text class="legend-label" x="{}" y="{}" text-anchor="middle" font-family="{FONT_FAMILY}" font-size="12" fill="#333">{}</text>"##,
            fmt_number(i as f64 * item_width + item_width / 2.0),
            LEGEND_HEIGHT + LEGEND_LABEL_GAP,
            xml_escape(bucket.label),
        );
    }
    out.push_str("  </g>\n");
}

const TOOLTIP_STYLE: &str = "position:absolute;background:rgba(0,0,0,0.9);color:white;padding:12px;\
border-radius:8px;font-size:14px;font-family:Inter,system-ui,sans-serif;\
box-shadow:0 4px 12px rgba(0,0,0,0.3);pointer-events:none;z-index:1000";

/// The shared tooltip panel: hidden when idle, filled in and placed next to
/// the pointer when a county is hovered.
pub fn render_tooltip(model: &MapModel, hover: &HoverState) -> String {
    match Tooltip::resolve(hover, model) {
        None => format!(r#"<div id="tooltip" style="opacity:0;{TOOLTIP_STYLE}"></div>"#),
        Some(tooltip) => format!(
            r#"<div id="tooltip" data-education="{}" style="opacity:1;{TOOLTIP_STYLE};left:{}px;top:{}px"><div><strong>{}</strong><br/><span>{}</span><br/><span>{}</span></div></div>"#,
            tooltip.record.bachelors_or_higher,
            fmt_number(tooltip.left),
            fmt_number(tooltip.top),
            xml_escape(&tooltip.heading()),
            xml_escape(&tooltip.education_line()),
            xml_escape(&tooltip.fips_line()),
        ),
    }
}

// Client-side copy of the hover handlers in `tooltip`, driven by the data
// attributes on each county path.
const HOVER_SCRIPT: &str = r#"<script>
(function () {
  var tooltip = document.getElementById('tooltip');
  var active = null;
  function leave() {
    if (active) {
      active.setAttribute('stroke', '@DEFAULT_COLOR@');
      active.setAttribute('stroke-width', '@DEFAULT_WIDTH@');
      active = null;
    }
    tooltip.style.opacity = 0;
    tooltip.removeAttribute('data-education');
  }
  function line(tag, text) {
    var el = document.createElement(tag);
    el.textContent = text;
    return el;
  }
  document.querySelectorAll('.county').forEach(function (el) {
    el.addEventListener('mouseover', function (event) {
      leave();
      if (!el.dataset.name) return;
      active = el;
      el.setAttribute('stroke', '@EMPHASIS_COLOR@');
      el.setAttribute('stroke-width', '@EMPHASIS_WIDTH@');
      var body = document.createElement('div');
      body.appendChild(line('strong', el.dataset.name + ', ' + el.dataset.state));
      body.appendChild(document.createElement('br'));
      body.appendChild(line('span', 'Education: ' + el.dataset.education + '%'));
      body.appendChild(document.createElement('br'));
      body.appendChild(line('span', 'FIPS: ' + el.dataset.fips));
      tooltip.replaceChildren(body);
      tooltip.setAttribute('data-education', el.dataset.education);
      tooltip.style.left = (event.pageX + @OFFSET_X@) + 'px';
      tooltip.style.top = (event.pageY + @OFFSET_Y@) + 'px';
      tooltip.style.opacity = 1;
    });
    el.addEventListener('mouseout', leave);
  });
})();
</script>"#;

fn hover_script() -> String {
    HOVER_SCRIPT
        .replace("@DEFAULT_COLOR@", DEFAULT_STROKE.color)
        .replace("@DEFAULT_WIDTH@", &DEFAULT_STROKE.width.to_string())
        .replace("@EMPHASIS_COLOR@", EMPHASIS_STROKE.color)
        .replace("@EMPHASIS_WIDTH@", &EMPHASIS_STROKE.width.to_string())
        .replace("@OFFSET_X@", &TOOLTIP_OFFSET.0.to_string())
        .replace("@OFFSET_Y@", &TOOLTIP_OFFSET.1.to_string())
}

fn page(body: &str) -> String {
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
<meta charset="utf-8"/>
<meta name="viewport" content="width=device-width, initial-scale=1"/>
<title>{}</title>
<style>
body {{ margin: 0; padding: 2rem 0; min-height: 100vh; background: linear-gradient(135deg, #eff6ff, #e0e7ff); font-family: {FONT_FAMILY}; }}
main {{ max-width: 72rem; margin: 0 auto; padding: 1.5rem; background: #fff; border-radius: 0.75rem; text-align: center; }}
.map {{ max-width: 64rem; margin: 0 auto 1.5rem; padding: 1rem; background: #f9fafb; border-radius: 0.5rem; }}
.hint, .loading {{ color: #6b7280; }}
</style>
</head>
<body>
{body}
</body>
</html>
"#,
        xml_escape(TITLE),
    )
}

/// Full page for a loaded map.
pub fn render_page(model: &MapModel, hover: &HoverState) -> String {
    let body = format!(
        r#"<main>
<h1 id="title">{}</h1>
<p id="description">{}</p>
<div class="map">
{}</div>
<div class="hint">{}</div>
</main>
{}
{}"#,
        xml_escape(TITLE),
        xml_escape(DESCRIPTION),
        render_svg(model, hover),
        xml_escape(HINT),
        render_tooltip(model, hover),
        hover_script(),
    );
    page(&body)
}

/// Shown until both datasets are loaded, and forever if loading fails.
pub fn render_loading_page() -> String {
    page(&format!(r#"<div class="loading">{LOADING}</div>"#))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::processing::build_model;
    use crate::test_support::{sample_model, sample_records, three_county_topology_json};
    use crate::tooltip::Pointer;
    use crate::types::Datasets;
    use serde_json::json;

    fn county_tag<'a>(svg: &'a str, fips: u32) -> &'a str {
        let needle = format!(r#"data-fips="{fips}""#);
        svg.lines().find(|l| l.contains(&needle)).unwrap()
    }

    #[test]
    fn scenario_fills_and_attributes() {
        let svg = render_svg(&sample_model(), &HoverState::Idle);

        let autauga = county_tag(&svg, 1001);
        assert!(autauga.contains(r##"fill="#c6dbef""##));
        assert!(autauga.contains(r#"data-education="22.5""#));

        let baldwin = county_tag(&svg, 1003);
        assert!(baldwin.contains(r##"fill="#08306b""##));
    }

    #[test]
    fn county_without_record_shows_fallback_and_zero() {
        let svg = render_svg(&sample_model(), &HoverState::Idle);
        let missing = county_tag(&svg, 9999);
        assert!(missing.contains(r##"fill="#ccc""##));
        assert!(missing.contains(r#"data-education="0""#));
        assert!(!missing.contains("data-name"));
    }

    #[test]
    fn county_with_text_id_is_drawn_with_fallback() {
        let mut topology = three_county_topology_json();
        topology["objects"]["counties"]["geometries"][2]["id"] = json!("XX");
        let model = build_model(&Datasets {
            education: sample_records(),
            topology: serde_json::from_value(topology).unwrap(),
        })
        .unwrap();

        let svg = render_svg(&model, &HoverState::Idle);
        let tag = svg.lines().find(|l| l.contains(r#"data-fips="XX""#)).unwrap();
        assert!(tag.contains(r##"fill="#ccc""##));
        assert!(tag.contains(r#"data-education="0""#));
        assert!(tag.contains(r##"stroke="#fff""##));
    }

    #[test]
    fn every_county_is_styled() {
        let svg = render_svg(&sample_model(), &HoverState::Idle);
        let paths: Vec<&str> = svg.lines().filter(|l| l.contains(r#"class="county""#)).collect();
        assert_eq!(paths.len(), 3);
        assert!(paths.iter().all(|p| p.contains("fill=\"#")));
    }

    #[test]
    fn borders_are_drawn_over_counties() {
        let svg = render_svg(&sample_model(), &HoverState::Idle);
        let last_county = svg.rfind(r#"class="county""#).unwrap();
        let borders = svg.find(r#"id="state-borders""#).unwrap();
        let legend = svg.find(r#"id="legend""#).unwrap();
        assert!(last_county < borders && borders < legend);
        assert!(svg.contains(r#"d="M2,0L2,1" fill="none""#));
    }

    #[test]
    fn legend_has_five_swatches_centred_under_the_map() {
        let svg = render_svg(&sample_model(), &HoverState::Idle);
        assert!(svg.contains(r#"transform="translate(280, 540)""#));
        let swatches: Vec<&str> = svg.lines().filter(|l| l.contains("legend-item")).collect();
        assert_eq!(swatches.len(), 5);
        for (swatch, bucket) in swatches.iter().zip(BUCKETS.iter()) {
            assert!(swatch.contains(&format!(r#"fill="{}""#, bucket.color)));
            assert!(swatch.contains(r#"width="80""#));
        }
        assert!(svg.contains(">&lt; 15%</text>"));
        assert!(svg.contains(">&gt; 60%</text>"));
    }

    #[test]
    fn hovered_county_is_emphasised_and_tooltip_visible() {
        let model = sample_model();
        let mut hover = HoverState::Idle;
        hover.enter(model.county(1001).unwrap(), Pointer { x: 50.0, y: 80.0 });

        let svg = render_svg(&model, &hover);
        assert!(county_tag(&svg, 1001).contains(r##"stroke="#333" stroke-width="2""##));
        assert!(county_tag(&svg, 1003).contains(r##"stroke="#fff" stroke-width="0.5""##));

        let tooltip = render_tooltip(&model, &hover);
        assert!(tooltip.contains(r#"data-education="22.5""#));
        assert!(tooltip.contains("opacity:1"));
        assert!(tooltip.contains("left:60px;top:52px"));
        assert!(tooltip.contains("Autauga County, AL"));
    }

    #[test]
    fn hover_cycle_renders_identically_to_idle() {
        let model = sample_model();
        let idle = render_svg(&model, &HoverState::Idle);

        let mut hover = HoverState::Idle;
        hover.enter(model.county(1003).unwrap(), Pointer::default());
        hover.leave();
        assert_eq!(render_svg(&model, &hover), idle);
    }

    #[test]
    fn idle_tooltip_is_hidden() {
        let tooltip = render_tooltip(&sample_model(), &HoverState::Idle);
        assert!(tooltip.contains("opacity:0"));
        assert!(tooltip.contains("pointer-events:none"));
        assert!(!tooltip.contains("data-education"));
    }

    #[test]
    fn page_has_title_description_and_map() {
        let html = render_page(&sample_model(), &HoverState::Idle);
        assert!(html.contains(r#"<h1 id="title">United States Educational Attainment</h1>"#));
        assert!(html.contains(r#"id="description""#));
        assert!(html.contains("bachelor&apos;s degree"));
        assert!(html.contains("<svg"));
        assert!(html.contains(r#"id="tooltip""#));
        assert!(html.contains("setAttribute('stroke', '#333')"));
        assert!(!html.contains('@'));
    }

    #[test]
    fn loading_page_has_no_map() {
        let html = render_loading_page();
        assert!(html.contains("Loading choropleth map..."));
        assert!(!html.contains("<svg"));
        assert!(!html.contains("county"));
    }

    #[test]
    fn names_are_escaped() {
        assert_eq!(xml_escape(r#"A & B <"x">"#), "A &amp; B &lt;&quot;x&quot;&gt;");
    }
}
