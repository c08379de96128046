//! Pipeline facades: trace-code generation and optimized-code generation.
//!
//! Stage order is fixed and total; every stage finishes its walk before the
//! next begins, and nothing here retries or runs speculatively. The trace
//! facade instruments; the optimize facade consumes one trace artifact and
//! produces the optimized source plus the extracted payload.

use crate::ast;
use crate::minify;
use crate::passes::{self, Mode, NameAlloc};
use crate::refcheck;
use crate::trace::{self, TraceData};
use anyhow::Result;

pub struct OptimizeOptions {
    /// Prepend the runtime loader (payload prefetch plus `_X`) to the
    /// optimized output.
    pub include_loader: bool,
    /// Keep payload text inline in plain eval arguments instead of
    /// extracting it; useful when debugging the rewrite itself.
    pub keep_code: bool,
}

impl Default for OptimizeOptions {
    fn default() -> Self {
        Self {
            include_loader: true,
            keep_code: false,
        }
    }
}

pub struct Optimized {
    pub code: String,
    pub extracted: Vec<String>,
}

/// Instrument `source` and prefix it with the counter runtime. Running the
/// result (and exercising it the way a real session would) leaves the trace
/// artifact readable at the trace-data global.
pub fn generate_trace_code(source: &str) -> Result<String> {
    let mut program = ast::parse(source)?;
    let mut alloc = NameAlloc::for_program(&program);
    run_construct_passes(&mut program, Mode::Trace, &mut alloc)?;
    Ok(format!("{};{};", trace::runtime_code(), ast::gen_code(&program)))
}

/// Rewrite `source` so the code paths `trace` never saw are deferred into
/// lazily fetched eval payloads.
pub fn generate_optimized_code(source: &str, trace: &TraceData, options: &OptimizeOptions) -> Result<Optimized> {
    let original = ast::parse(source)?;
    let mut program = original.clone();
    let mut alloc = NameAlloc::for_program(&program);

    run_construct_passes(&mut program, Mode::Optimize(trace), &mut alloc)?;
    tracing::debug!("construct passes done");

    passes::hoist::run(&mut program)?;
    refcheck::validate(&original, &program)?;
    tracing::debug!("hoisting repaired and references validated");

    passes::materialize::run(&mut program, &mut alloc)?;

    minify::compress(&mut program);
    // reparse the compressed print so fusion sees the flattened chains
    let mut program = ast::parse(&ast::gen_code(&program))?;
    passes::fusion::run(&mut program)?;

    let extracted = passes::extract::run(&mut program, options.keep_code)?;
    tracing::debug!("extracted {} payload entries", extracted.len());

    let mut code = ast::gen_code(&program);
    if options.include_loader {
        code = format!("{}{}", LOADER_CODE, code);
    }
    Ok(Optimized { code, extracted })
}

fn run_construct_passes(program: &mut ast::Program, mode: Mode<'_>, alloc: &mut NameAlloc) -> Result<()> {
    passes::const_literal::run(program, mode)?;
    passes::if_else::run(program)?;
    passes::block::run(program, mode)?;
    passes::switch::run(program, mode, alloc)?;
    passes::logical::run(program, mode)?;
    passes::conditional::run(program, mode)?;
    Ok(())
}

/// The extracted payload as a JS module body: loading it with
/// `Function(text)()` yields `{getCode(i)}`.
pub fn render_extracted_js(extracted: &[String]) -> String {
    let data = serde_json::json!({ "extractedCodes": extracted });
    format!(
        "\"use strict\";const data={};return{{getCode(i){{return data.extractedCodes[i]}}}}",
        data
    )
}

/// Runtime loader prepended to optimized output. Prefetches the payload
/// immediately; the first synthesized eval that runs before the prefetch
/// resolves falls back to a synchronous fetch, so execution order never
/// changes.
const LOADER_CODE: &str = r#""use strict";
(() => {
  function getExtractedFileUrl() {
    const src = document.currentScript.src;
    const candidate = src.replace(/(\.coldpath-main)?\.js$/, '.coldpath-extracted.js');
    if (candidate === src) throw new Error('cannot figure out extracted file URL');
    return candidate;
  }
  const extractedJsUrl = getExtractedFileUrl();

  let fetchedExtractedJs;
  const ac = new AbortController();
  fetch(extractedJsUrl, {signal: ac.signal}).then(r => r.text()).then(text => {
    fetchedExtractedJs = text;
  });

  const syncXhr = (url) => {
    ac.abort();
    const request = new XMLHttpRequest();
    request.open("GET", url, false);
    request.send(null);
    if (request.status === 200) {
      return request.responseText;
    }
    throw new Error('failed to fetch ' + url + ': ' + request.status);
  };

  let fetchedFn;
  const fetchCodeSync = () => {
    if (fetchedFn) return fetchedFn;
    fetchedExtractedJs = fetchedExtractedJs || syncXhr(extractedJsUrl);
    fetchedFn = Function(fetchedExtractedJs)();
    return fetchedFn;
  };

  globalThis._X = (i) => {
    return fetchCodeSync().getCode(i);
  };
})();
"#;
