/*!

This is the long-form manual for `poll_stats` and `lovedpolls`.

## Input formats

### Poll history export (`csv`)

A CSV file with a header row. The first seven columns are read, in this order:

| column | content |
|---|---|
| `round` | the voting cycle |
| `end_time` | closing time of the poll, e.g. `2020-01-01T00:00:00+00:00` |
| `game_mode` | `0` standard, `1` taiko, `2` catch, `3` mania |
| `beatmapset_id` | the beatmap set being voted on |
| `topic_id` | the forum topic of the poll |
| `yes_count` | number of yes votes |
| `no_count` | number of no votes |

Anything after the first `+` of the timestamp is dropped, and the remainder is read as UTC.
Extra columns are ignored.

### Serialized history (`npy`)

The converted history is stored as a NumPy `.npy` file: little-endian 64-bit floats, C order,
with shape `(polls, 7)` and the same column order as above. The timestamp is stored as seconds
since the Unix epoch. The file can be opened directly with `numpy.load`.

## Analyses

All the analyses split the polls per game mode and draw one panel per mode.

### `loved-rate`

For 1000 thresholds between 0 and 1, the share of polls whose yes ratio is at least the
threshold. It answers: _what yes ratio is required if a certain share of all the maps voted on
should be loved?_ The command also prints, for the loved rates 100%, 95%, 90%, 85%, 80%, 75% and
50%, the first threshold at which the rate drops below that value.

### `participation`

Each poll as a point (total votes, yes ratio), with the mean yes ratio over 20 equal-width bins
of total votes drawn on top.

### `cycle`

Each poll as a point (cycle, total votes). Polls whose yes ratio is at most 85% are drawn in red,
the others in blue.

## Polls without votes

A poll with no vote has no yes ratio. It is left out of the `loved-rate` and `participation`
computations and reported in the `skipped` field of the summary. On the `cycle` chart it is kept
(its total is zero) and counts as not passing. A game mode without any usable poll is reported
with a `null` result and an empty panel.

## Settings

A JSON file may be passed with `--config`:

```json
{
  "dataPath": "data/player_skills.npy",
  "outputDirectory": "data",
  "rules": { "thresholdPoints": 1000, "numBins": 20, "passThreshold": 0.85 }
}
```

Command line flags take precedence over the file.
*/
