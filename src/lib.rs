/*!

Tables of species observations in, biodiversity indices and a conversation out.

[`census::run_analysis`] is what the `biocensus` program runs: it reads the configured
tables, computes the indices with [`diversity_index`], writes the summary and hands the
result off to the conversation with the analyst.

The pieces can also be driven one by one:
- [`census::session::AnalysisSession`] holds a table, a column selection and the latest
  result,
- [`census::transcript::Transcript`] is the conversation, seeded with
  [`census::session::AnalysisSession::hand_off`],
- [`census::completion`] talks to a language model through a [`census::completion::CompletionClient`]
  provided by the caller, and turns photographed tables into tables.

```
use biocensus::census::completion::{CompletionClient, CompletionError, CompletionRequest};
use biocensus::census::session::AnalysisSession;
use biocensus::census::transcript::Transcript;
use diversity_index::builder::Builder;
use diversity_index::{ColumnSelection, NormalizeRules};

struct Echo;

impl CompletionClient for Echo {
    fn complete(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        Ok(format!("You sent {} characters.", request.prompt.len()))
    }
}

let mut builder = Builder::new(&["species", "count"]);
builder.add_row_simple(&["Rana temporaria", "12"]);
builder.add_row_simple(&["Bufo bufo", "3"]);

let mut session = AnalysisSession::new(NormalizeRules::DEFAULT_RULES);
session.load_table("pond.csv", builder.build());
session.select_columns(ColumnSelection::new("species", Some("count")))?;
assert_eq!(session.calculate()?.richness, 2);

let mut chat = Transcript::new();
chat.preload(&session.hand_off().unwrap());
assert!(chat.send(&Echo, None));
assert_eq!(chat.messages().len(), 3);
# Ok::<(), biocensus::census::CensusError>(())
```

*/
pub mod census;
