//! Benchmarks for the template pipeline.
//!
//! Run with: cargo bench
//! Run specific benchmark: cargo bench -- batch

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use stencil::analyzers::{BatchAnalyzer, TemplateAnalyzer};
use stencil::config::Config;
use stencil::core::{AnalysisContext, Analyzer, TemplateInput};
use stencil::parser::{Parser, TemplateParser};

const LAYOUT: &str = r#"<!DOCTYPE html>
<html>
<head><title>{% block title %}{% endblock %}</title></head>
<body>
    {% include 'partials/_nav.twig' %}
    {% block body %}{% endblock %}
</body>
</html>
"#;

fn page(i: usize) -> String {
    format!(
        r#"{{% extends 'layouts/base.twig' %}}
{{% import 'macros/forms.twig' as forms %}}
{{# page {i} #}}
{{% block title %}}Page {i}{{% endblock %}}
{{% block body %}}
    {{% for row in rows %}}
        {{% if row.visible and (row.count > 0 or row.pinned) %}}
            <tr>{{% for cell in row.cells %}}<td>{{{{ cell.value|default('-')|upper }}}}</td>{{% endfor %}}</tr>
        {{% else %}}
            {{{{ row.fallback ?? 'n/a' }}}}
        {{% endif %}}
    {{% endfor %}}
    {{{{ forms.input('q', query) }}}}
    {{% include 'partials/_card.twig' with {{ title: 'card {i}' }} %}}
{{% endblock %}}
"#
    )
}

fn template_set(count: usize) -> Vec<TemplateInput> {
    let mut inputs = vec![
        TemplateInput::from_content("layouts/base.twig", LAYOUT),
        TemplateInput::from_content("partials/_nav.twig", "<nav>{% for l in links %}{{ l.url }}{% endfor %}</nav>"),
        TemplateInput::from_content("partials/_card.twig", "<div>{{ title|e }}</div>"),
        TemplateInput::from_content(
            "macros/forms.twig",
            "{% macro input(name, value) %}<input name=\"{{ name }}\" value=\"{{ value|e }}\">{% endmacro %}",
        ),
    ];
    inputs.extend((0..count).map(|i| TemplateInput::from_content(format!("pages/page_{i}.twig"), page(i))));
    inputs
}

fn bench_parser(c: &mut Criterion) {
    let source = page(0);
    let parser = Parser::new();
    let mut group = c.benchmark_group("parser");
    group.throughput(Throughput::Bytes(source.len() as u64));
    group.bench_function("page", |b| {
        b.iter(|| parser.parse(black_box("pages/page_0.twig"), black_box(&source)))
    });
    group.finish();
}

fn bench_template(c: &mut Criterion) {
    let config = Config::default();
    let analyzer = TemplateAnalyzer::new(&config);
    let input = TemplateInput::from_content("pages/page_0.twig", page(0));
    c.bench_function("template/page", |b| b.iter(|| analyzer.analyze(black_box(&input))));
}

fn bench_batch(c: &mut Criterion) {
    let config = Config::default();
    let mut group = c.benchmark_group("batch");
    for count in [10, 100, 500] {
        let inputs = template_set(count);
        group.throughput(Throughput::Elements(inputs.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &inputs, |b, inputs| {
            let analyzer = BatchAnalyzer::new(&config);
            b.iter(|| analyzer.analyze(black_box(inputs)))
        });
    }
    group.finish();
}

fn bench_report(c: &mut Criterion) {
    let config = Config::default();
    let batch = BatchAnalyzer::new(&config).analyze(&template_set(200));
    let analyzer = stencil::score::Analyzer::new();
    c.bench_function("report/200", |b| {
        b.iter(|| analyzer.analyze(&AnalysisContext::new(black_box(&batch), &config)))
    });
}

criterion_group!(benches, bench_parser, bench_template, bench_batch, bench_report);
criterion_main!(benches);
