//! Dashboard page with D3.js cause charts
//!
//! The same page is served live by `riskmon serve` (with working controls
//! and clickable rows) and written as a static report.

use crate::drilldown::{CauseStage, EvidenceStage, Session, Stage};
use crate::model::{FilterState, Period, MIN_REVIEWS_MAX, MIN_REVIEWS_STEP, TOP_N_MAX, TOP_N_MIN};
use crate::ranking::RankingView;
use crate::report;
use crate::serve::DashboardParams;
use std::io::{self, Write};

const STYLE: &str = r#"
    :root {
        --bg: #0d1117;
        --card: #161b22;
        --border: #30363d;
        --text: #e6edf3;
        --dim: #7d8590;
        --ok: #3fb950;
        --warn: #d29922;
        --risk: #f85149;
        --accent: #58a6ff;
    }
    * { box-sizing: border-box; margin: 0; padding: 0; }
    body {
        font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
        background: var(--bg);
        color: var(--text);
        line-height: 1.5;
    }
    .container { max-width: 1600px; margin: 0 auto; padding: 2rem; }
    .header {
        display: flex;
        align-items: baseline;
        gap: 1rem;
        margin-bottom: 1.5rem;
        padding-bottom: 1rem;
        border-bottom: 1px solid var(--border);
    }
    .logo {
        font-size: 2rem;
        font-weight: 800;
        background: linear-gradient(135deg, var(--accent), #a371f7);
        -webkit-background-clip: text;
        -webkit-text-fill-color: transparent;
    }
    .subtitle { color: var(--dim); }
    .controls {
        display: flex;
        flex-wrap: wrap;
        gap: 1.5rem;
        align-items: center;
        background: var(--card);
        border: 1px solid var(--border);
        border-radius: 12px;
        padding: 1rem 1.5rem;
        margin-bottom: 1.5rem;
    }
    .controls label { color: var(--dim); font-size: 0.875rem; display: flex; gap: 0.5rem; align-items: center; }
    .controls select, .controls input { background: var(--bg); color: var(--text); border: 1px solid var(--border); border-radius: 6px; padding: 0.25rem 0.5rem; }
    .api-status { margin-left: auto; color: var(--dim); font-size: 0.8rem; font-family: monospace; }
    .banner {
        border-radius: 12px;
        padding: 1rem 1.5rem;
        margin-bottom: 1.5rem;
        border: 1px solid;
    }
    .banner.error { border-color: var(--risk); color: var(--risk); background: rgba(248,81,73,0.08); }
    .banner.warning { border-color: var(--warn); color: var(--warn); background: rgba(210,153,34,0.08); }
    .notice { color: var(--dim); font-style: italic; padding: 0.5rem 0; }
    .notice.error { color: var(--risk); font-style: normal; }
    .stats {
        display: grid;
        grid-template-columns: repeat(4, 1fr);
        gap: 1rem;
        margin-bottom: 1.5rem;
    }
    .stat {
        background: var(--card);
        border: 1px solid var(--border);
        border-radius: 12px;
        padding: 1.25rem;
        text-align: center;
    }
    .stat-value { font-size: 2rem; font-weight: 700; line-height: 1.1; }
    .stat-label { color: var(--dim); font-size: 0.8rem; text-transform: uppercase; letter-spacing: 0.05em; margin-top: 0.5rem; }
    .main { display: grid; grid-template-columns: 3fr 2fr; gap: 1.5rem; margin-bottom: 1.5rem; }
    .card {
        background: var(--card);
        border: 1px solid var(--border);
        border-radius: 12px;
        padding: 1.5rem;
    }
    .card-title { font-size: 1rem; font-weight: 600; margin-bottom: 1rem; color: var(--dim); }
    table { width: 100%; border-collapse: collapse; }
    th, td { padding: 0.6rem 0.75rem; text-align: left; }
    th {
        font-weight: 600;
        font-size: 0.75rem;
        text-transform: uppercase;
        letter-spacing: 0.05em;
        color: var(--dim);
        border-bottom: 1px solid var(--border);
    }
    td { border-bottom: 1px solid var(--border); }
    tr.selected td { background: rgba(88,166,255,0.1); }
    td a { color: var(--accent); text-decoration: none; font-family: monospace; }
    .mono { font-family: monospace; }
    .rate-cell { display: flex; align-items: center; gap: 0.5rem; }
    .rate-bar { width: 80px; height: 6px; background: var(--border); border-radius: 3px; overflow: hidden; }
    .rate-fill { height: 100%; background: var(--risk); }
    .evidence-item {
        border-left: 3px solid var(--warn);
        background: rgba(210,153,34,0.06);
        padding: 0.75rem 1rem;
        margin-bottom: 0.75rem;
        border-radius: 0 8px 8px 0;
    }
    .tooltip {
        position: absolute;
        background: var(--card);
        border: 1px solid var(--border);
        padding: 0.4rem 0.6rem;
        border-radius: 6px;
        font-size: 0.8rem;
        pointer-events: none;
        opacity: 0;
    }
    .tooltip.visible { opacity: 1; }
"#;

const CHART_SCRIPT: &str = r#"
    const palette = ['#a5d8ff', '#ffc9c9', '#b2f2bb', '#ffec99', '#d0bfff', '#ffd8a8', '#99e9f2', '#eebefa'];

    function showTooltip(event, text) {
        const tooltip = document.getElementById('tooltip');
        tooltip.textContent = text;
        tooltip.classList.add('visible');
        tooltip.style.left = (event.pageX + 10) + 'px';
        tooltip.style.top = (event.pageY - 10) + 'px';
    }

    function hideTooltip() {
        document.getElementById('tooltip').classList.remove('visible');
    }

    function drawDonutChart() {
        const el = document.getElementById('donut-chart');
        if (!el || causes.length === 0) return;
        const size = 260, radius = size / 2;
        const total = d3.sum(causes, d => d.conteo);
        const svg = d3.select(el).append('svg')
            .attr('width', size).attr('height', size)
            .append('g').attr('transform', `translate(${radius},${radius})`);
        const pie = d3.pie().value(d => d.conteo).sort(null);
        const arc = d3.arc().innerRadius(radius * 0.4).outerRadius(radius - 4);
        svg.selectAll('path').data(pie(causes)).enter().append('path')
            .attr('d', arc)
            .attr('fill', (d, i) => palette[i % palette.length])
            .on('mousemove', (e, d) => showTooltip(e, `${d.data.causa}: ${d.data.conteo}`))
            .on('mouseout', hideTooltip);
        svg.selectAll('text').data(pie(causes)).enter().append('text')
            .attr('transform', d => `translate(${arc.centroid(d)})`)
            .attr('text-anchor', 'middle')
            .attr('fill', '#0d1117')
            .style('font-size', '11px')
            .text(d => total ? `${Math.round(d.data.conteo / total * 100)}%` : '');
    }

    function drawBarChart() {
        const el = document.getElementById('bar-chart');
        if (!el || causes.length === 0) return;
        const margin = { top: 8, right: 40, bottom: 28, left: 160 };
        const width = el.clientWidth || 480;
        const height = causes.length * 28 + margin.top + margin.bottom;
        const svg = d3.select(el).append('svg').attr('width', width).attr('height', height);
        const x = d3.scaleLinear()
            .domain([0, d3.max(causes, d => d.conteo) || 1])
            .range([margin.left, width - margin.right]);
        const y = d3.scaleBand()
            .domain(causes.map(d => d.causa))
            .range([height - margin.bottom, margin.top])
            .padding(0.2);
        const color = d3.scaleSequential(d3.interpolateReds).domain([0, d3.max(causes, d => d.conteo) || 1]);
        svg.append('g').selectAll('rect').data(causes).enter().append('rect')
            .attr('x', x(0)).attr('y', d => y(d.causa))
            .attr('width', d => x(d.conteo) - x(0)).attr('height', y.bandwidth())
            .attr('fill', d => color(d.conteo));
        svg.append('g').selectAll('text').data(causes).enter().append('text')
            .attr('x', d => x(d.conteo) + 4).attr('y', d => y(d.causa) + y.bandwidth() / 2 + 4)
            .attr('fill', '#e6edf3').style('font-size', '11px')
            .text(d => d.conteo);
        svg.append('g').attr('transform', `translate(${margin.left},0)`)
            .call(d3.axisLeft(y)).selectAll('text').attr('fill', '#7d8590');
        svg.append('g').attr('transform', `translate(0,${height - margin.bottom})`)
            .call(d3.axisBottom(x).ticks(5)).selectAll('text').attr('fill', '#7d8590');
    }

    drawDonutChart();
    drawBarChart();
"#;

/// Write the dashboard for `session`. With `live` set, controls submit
/// back to the server and table rows link to their drill-down.
pub fn write<W: Write>(writer: &mut W, session: &Session, live: bool) -> io::Result<()> {
    write!(
        writer,
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <title>Return Risk Monitor</title>
    <script src="https://d3js.org/d3.v7.min.js"></script>
    <style>{style}</style>
</head>
<body>
<div class="container">
    <div class="header">
        <div class="logo">Return Risk Monitor</div>
        <div class="subtitle">Review-driven return risk and root causes</div>
    </div>
"#,
        style = STYLE
    )?;

    let filter = session.filter().cloned().unwrap_or_default();
    let status = match session.stage() {
        Stage::RankingLoadFailed { api_url, .. } => format!("API unreachable: {}", escape(api_url)),
        Stage::RankingLoaded { api_url, .. } => format!("API connected: {}", escape(api_url)),
        Stage::NoPeriod | Stage::PeriodSelected { .. } => String::new(),
    };
    write_controls(writer, &filter, live, &status)?;

    let mut causes_json = "[]".to_string();
    match session.stage() {
        Stage::NoPeriod | Stage::PeriodSelected { .. } => {
            writeln!(writer, r#"    <div class="notice">Select a period to load the ranking.</div>"#)?;
        }
        Stage::RankingLoadFailed { api_url, .. } => {
            writeln!(
                writer,
                r#"    <div class="banner error">{}</div>"#,
                escape(&report::connectivity_banner(api_url))
            )?;
        }
        Stage::RankingLoaded { filter, view, selection, .. } => {
            write_kpis(writer, view)?;

            if view.below_threshold() {
                writeln!(
                    writer,
                    r#"    <div class="banner warning">{}</div>"#,
                    escape(&report::below_threshold(filter.min_reviews))
                )?;
            } else {
                let selected = selection.as_ref().map(|s| s.asin.as_str());
                writeln!(writer, r#"    <div class="main">"#)?;
                write_table(writer, filter, view, selected, live)?;
                write_cause_panel(writer, filter, view, selection.as_ref(), live)?;
                writeln!(writer, "    </div>")?;

                if let Some(sel) = selection {
                    if let CauseStage::Loaded { causes, principal, evidence } = &sel.causes {
                        causes_json = script_json(causes);
                        write_evidence(writer, principal, evidence)?;
                    }
                }
            }
        }
    }

    write!(
        writer,
        r#"</div>
<div class="tooltip" id="tooltip"></div>
<script>
    const causes = {causes_json};
{script}
</script>
</body>
</html>
"#,
        causes_json = causes_json,
        script = CHART_SCRIPT
    )?;

    Ok(())
}

fn write_controls<W: Write>(
    writer: &mut W,
    filter: &FilterState,
    live: bool,
    status: &str,
) -> io::Result<()> {
    if !live {
        return writeln!(
            writer,
            r#"    <div class="controls"><span>Period <b>{}</b></span><span>Top {}</span><span>Min. reviews {}</span><span class="api-status">{}</span></div>"#,
            filter.periodo, filter.top_n, filter.min_reviews, status
        );
    }

    let options: String = Period::all()
        .map(|p| {
            let sel = if p == filter.periodo { " selected" } else { "" };
            format!(r#"<option value="{p}"{sel}>{p}</option>"#)
        })
        .collect();

    writeln!(
        writer,
        r#"    <form class="controls" method="get" action="/">
        <label>Period <select name="periodo" onchange="this.form.submit()">{options}</select></label>
        <label>Top risk <input type="range" name="top_n" min="{tmin}" max="{tmax}" value="{top_n}" onchange="this.form.submit()" oninput="this.nextElementSibling.textContent=this.value"><span>{top_n}</span></label>
        <label>Min. reviews <input type="range" name="min_reviews" min="0" max="{rmax}" step="{rstep}" value="{min_reviews}" onchange="this.form.submit()" oninput="this.nextElementSibling.textContent=this.value"><span>{min_reviews}</span></label>
        <span class="api-status">{status}</span>
    </form>"#,
        options = options,
        tmin = TOP_N_MIN,
        tmax = TOP_N_MAX,
        top_n = filter.top_n,
        rmax = MIN_REVIEWS_MAX,
        rstep = MIN_REVIEWS_STEP,
        min_reviews = filter.min_reviews,
        status = status
    )
}

fn write_kpis<W: Write>(writer: &mut W, view: &RankingView) -> io::Result<()> {
    let k = &view.kpis;
    writeln!(
        writer,
        r#"    <div class="stats">
        <div class="stat"><div class="stat-value">{}</div><div class="stat-label">Products at risk</div></div>
        <div class="stat"><div class="stat-value">{:.1}%</div><div class="stat-label">Avg. negative rate</div></div>
        <div class="stat"><div class="stat-value">{}</div><div class="stat-label">Review volume</div></div>
        <div class="stat"><div class="stat-value">{}</div><div class="stat-label">Period</div></div>
    </div>"#,
        k.products_at_risk,
        k.avg_negative_rate,
        thousands(k.total_reviews),
        k.periodo
    )
}

fn write_table<W: Write>(
    writer: &mut W,
    filter: &FilterState,
    view: &RankingView,
    selected: Option<&str>,
    live: bool,
) -> io::Result<()> {
    writeln!(
        writer,
        r#"        <div class="card">
            <div class="card-title">Ranking: top {} critical products</div>
            <table>
                <thead><tr><th>Rank</th><th>ASIN</th><th>Negative (%)</th><th>Reviews</th><th>Complaints</th></tr></thead>
                <tbody>"#,
        view.visible.len()
    )?;

    for r in &view.visible {
        let class = if selected == Some(r.asin.as_str()) { r#" class="selected""# } else { "" };
        let asin_cell = if live {
            let href = DashboardParams::for_view(filter, Some(&r.asin)).to_href();
            format!(r#"<a href="{}">{}</a>"#, escape(&href), escape(&r.asin))
        } else {
            format!(r#"<span class="mono">{}</span>"#, escape(&r.asin))
        };
        let pct = (r.pct_neg * 100.0).clamp(0.0, 100.0);
        writeln!(
            writer,
            r#"                <tr{class}><td>{rank}</td><td>{asin}</td><td><div class="rate-cell"><div class="rate-bar"><div class="rate-fill" style="width: {pct:.1}%"></div></div>{pct:.1}%</div></td><td>{reviews}</td><td>{neg}</td></tr>"#,
            class = class,
            rank = r.risk_rank,
            asin = asin_cell,
            pct = pct,
            reviews = r.n_reviews,
            neg = r.n_neg
        )?;
    }

    writeln!(writer, "                </tbody>\n            </table>\n        </div>")
}

fn write_cause_panel<W: Write>(
    writer: &mut W,
    filter: &FilterState,
    view: &RankingView,
    selection: Option<&crate::drilldown::Selection>,
    live: bool,
) -> io::Result<()> {
    writeln!(writer, r#"        <div class="card">
            <div class="card-title">Cause analysis</div>"#)?;

    if view.visible.is_empty() {
        writeln!(writer, r#"            <div class="notice">{}</div>"#, report::NO_VISIBLE_PRODUCTS)?;
    } else if live {
        let options: String = view
            .asins()
            .map(|a| {
                let sel = if selection.map(|s| s.asin.as_str()) == Some(a) { " selected" } else { "" };
                format!(r#"<option value="{a}"{sel}>{a}</option>"#, a = escape(a), sel = sel)
            })
            .collect();
        writeln!(
            writer,
            r#"            <form method="get" action="/" class="controls">
                <input type="hidden" name="periodo" value="{}">
                <input type="hidden" name="top_n" value="{}">
                <input type="hidden" name="min_reviews" value="{}">
                <label>ASIN <select name="asin" onchange="this.form.submit()">{}</select></label>
            </form>"#,
            filter.periodo, filter.top_n, filter.min_reviews, options
        )?;
    }

    match selection.map(|s| (&s.asin, &s.causes)) {
        None => {}
        Some((asin, CauseStage::Loaded { principal, .. })) => {
            writeln!(
                writer,
                r#"            <div class="notice">{} · principal cause: <b>{}</b></div>
            <div id="donut-chart"></div>
            <div id="bar-chart"></div>"#,
                escape(asin),
                escape(principal)
            )?;
        }
        Some((_, CauseStage::Empty)) => {
            writeln!(writer, r#"            <div class="notice">{}</div>"#, report::NO_CAUSES)?;
        }
        Some((_, CauseStage::Failed { .. })) => {
            writeln!(writer, r#"            <div class="notice error">{}</div>"#, report::CAUSES_FAILED)?;
        }
    }

    writeln!(writer, "        </div>")
}

fn write_evidence<W: Write>(writer: &mut W, principal: &str, evidence: &EvidenceStage) -> io::Result<()> {
    writeln!(
        writer,
        r#"    <div class="card">
        <div class="card-title">Voice of the customer: evidence for '{}'</div>"#,
        escape(principal)
    )?;

    match evidence {
        EvidenceStage::Loaded { items } => {
            for item in items {
                writeln!(
                    writer,
                    r#"        <div class="evidence-item">{}</div>"#,
                    escape(&report::evidence_line(item))
                )?;
            }
        }
        EvidenceStage::Empty => {
            writeln!(writer, r#"        <div class="notice">{}</div>"#, report::NO_EVIDENCE)?;
        }
        EvidenceStage::Failed { .. } => {
            writeln!(writer, r#"        <div class="notice error">{}</div>"#, report::EVIDENCE_FAILED)?;
        }
    }

    writeln!(writer, "    </div>")
}

/// JSON safe to inline inside a `<script>` block
fn script_json<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value)
        .unwrap_or_else(|_| "[]".to_string())
        .replace("</", "<\\/")
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

fn thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
